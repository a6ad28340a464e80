//! 成员过滤策略：自身排除 + 白名单 / 黑名单
//!
//! | 模式 | "true" | "false" | 缺省 / 其它 |
//! |---|---|---|---|
//! | 白名单 | 纳入 | 排除 | 排除 |
//! | 黑名单（默认） | 纳入 | 排除 | 纳入 |

use serde::Serialize;

/// 自身 id 比较用的短 id 长度
pub const SHORT_ID_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// 只管理显式标记为 "true" 的容器
    AllowList,
    /// 管理除显式标记为 "false" 以外的所有容器
    #[default]
    DenyList,
}

impl FilterMode {
    pub fn from_allow_list(allow_list_mode: bool) -> Self {
        if allow_list_mode {
            Self::AllowList
        } else {
            Self::DenyList
        }
    }

    /// 按启用标签的值决定是否纳入；缺省视为 ""
    pub fn admits(&self, label: Option<&str>) -> bool {
        let value = label.unwrap_or("");
        match self {
            FilterMode::AllowList => value == "true",
            FilterMode::DenyList => value != "false",
        }
    }
}

impl std::fmt::Display for FilterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterMode::AllowList => write!(f, "allowlist"),
            FilterMode::DenyList => write!(f, "denylist"),
        }
    }
}

/// candidate 与自身 id 相同，或二者前 12 个字符相同
pub fn is_self(candidate: &str, own_id: &str) -> bool {
    if own_id.is_empty() {
        return false;
    }
    if candidate == own_id {
        return true;
    }
    match (candidate.get(..SHORT_ID_LEN), own_id.get(..SHORT_ID_LEN)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_table() {
        let cases = [
            (FilterMode::AllowList, Some("true"), true),
            (FilterMode::AllowList, Some("false"), false),
            (FilterMode::AllowList, Some(""), false),
            (FilterMode::AllowList, None, false),
            (FilterMode::AllowList, Some("yes"), false),
            (FilterMode::DenyList, Some("true"), true),
            (FilterMode::DenyList, Some("false"), false),
            (FilterMode::DenyList, Some(""), true),
            (FilterMode::DenyList, None, true),
            (FilterMode::DenyList, Some("yes"), true),
        ];
        for (mode, label, expected) in cases {
            assert_eq!(mode.admits(label), expected, "{mode} / {label:?}");
        }
    }

    #[test]
    fn test_default_mode_is_denylist() {
        assert_eq!(FilterMode::default(), FilterMode::DenyList);
        assert_eq!(FilterMode::from_allow_list(true), FilterMode::AllowList);
    }

    #[test]
    fn test_is_self_full_and_short_id() {
        let full = "4f2c1a9b8e7d6c5b4a39281706f5e4d3c2b1a0f9e8d7c6b5a4938271605f4e3d";
        assert!(is_self(full, full));
        assert!(is_self(full, "4f2c1a9b8e7d"));
        assert!(is_self("4f2c1a9b8e7d", full));
        assert!(!is_self(full, "4f2c1a9b8e7e"));
    }

    #[test]
    fn test_is_self_short_or_empty_ids() {
        assert!(!is_self("abc", ""));
        assert!(!is_self("abcdef", "abc"));
        assert!(is_self("abc", "abc"));
    }
}
