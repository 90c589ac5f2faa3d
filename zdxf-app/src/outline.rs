//! 文档概览与诊断的文本输出。

use std::collections::BTreeMap;
use std::fmt::Write;

use serde_json::json;
use zdxf_core::document::{Block, Entity};
use zdxf_io::{ParseReport, Termination};

/// 按记录关键字统计实体数量，多段线同时累计顶点数。
fn summarize<'a>(entities: impl Iterator<Item = &'a Entity>) -> String {
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut vertices = 0;
    for entity in entities {
        *counts.entry(entity.kind_name()).or_default() += 1;
        if let Entity::Polyline(polyline) = entity {
            vertices += polyline.vertices.len();
        }
    }
    if counts.is_empty() {
        return "无实体".to_string();
    }
    let mut parts: Vec<String> = counts
        .iter()
        .map(|(kind, count)| format!("{kind} x{count}"))
        .collect();
    if vertices > 0 {
        parts.push(format!("顶点 {vertices}"));
    }
    parts.join(", ")
}

fn block_line(out: &mut String, indent: &str, block: &Block) {
    let _ = writeln!(
        out,
        "{indent}块 {} (图层 {:?}, 基点 ({:.3}, {:.3}, {:.3})): {}",
        block.name,
        block.layer,
        block.base_point.x(),
        block.base_point.y(),
        block.base_point.z(),
        summarize(block.entities.iter())
    );
}

pub fn render_outline(report: &ParseReport) -> String {
    let mut out = String::new();
    let document = &report.document;
    let ending = match report.termination {
        Termination::EndOfFile => "读到 EOF",
        Termination::EndOfInput => "输入提前结束",
    };
    let _ = writeln!(out, "共读取 {} 条记录，{ending}", report.records);

    for section in document.sections() {
        let _ = writeln!(out, "段落 {}", section.name);
        for block in &section.blocks {
            block_line(&mut out, "  ", block);
        }
        if !section.entities.is_empty() {
            let _ = writeln!(out, "  实体: {}", summarize(section.entities.iter()));
        }
    }

    if !document.unsectioned_blocks().is_empty() || !document.unsectioned_entities().is_empty() {
        let _ = writeln!(out, "段落之外");
        for block in document.unsectioned_blocks() {
            block_line(&mut out, "  ", block);
        }
        if !document.unsectioned_entities().is_empty() {
            let _ = writeln!(
                out,
                "  实体: {}",
                summarize(document.unsectioned_entities().iter())
            );
        }
    }
    out
}

pub fn render_diagnostics(report: &ParseReport) -> String {
    let diagnostics = &report.diagnostics;
    let mut out = String::new();
    if diagnostics.total() == 0 {
        return out;
    }
    let _ = writeln!(out, "诊断 {} 条：", diagnostics.len());
    for diagnostic in diagnostics {
        let _ = writeln!(out, "  {diagnostic}");
    }
    if diagnostics.suppressed() > 0 {
        let _ = writeln!(out, "  另有 {} 条诊断超出上限未保存", diagnostics.suppressed());
    }
    out
}

pub fn render_json(report: &ParseReport, with_diagnostics: bool) -> serde_json::Result<String> {
    let mut value = json!({
        "termination": serde_json::to_value(report.termination)?,
        "records": report.records,
        "document": serde_json::to_value(&report.document)?,
    });
    if with_diagnostics {
        let diagnostics: Vec<_> = report.diagnostics.iter().collect();
        value["diagnostics"] = serde_json::to_value(diagnostics)?;
        value["suppressed"] = json!(report.diagnostics.suppressed());
    }
    serde_json::to_string_pretty(&value)
}
