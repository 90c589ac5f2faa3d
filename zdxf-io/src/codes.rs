//! 组码的取值类型划分。

/// DXF 注释组码，只可能出现在记录边界之外。
pub const COMMENT: i32 = 999;

/// 组码携带的值类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Float,
    Text,
}

/// 按 DXF 参考手册的组码区间判定值类型，区间之外一律视为字符串。
pub fn value_kind(code: i32) -> ValueKind {
    match code {
        10..=59 | 110..=149 | 210..=239 | 460..=469 | 1010..=1059 => ValueKind::Float,
        60..=79
        | 90..=99
        | 160..=179
        | 270..=299
        | 370..=389
        | 400..=409
        | 420..=429
        | 440..=459
        | 1060..=1071 => ValueKind::Integer,
        _ => ValueKind::Text,
    }
}
