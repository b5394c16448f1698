use std::collections::HashMap;

use crate::error::{AppError, AppResult};

/// Nagios 对象名中不允许出现的字符（illegal_object_name_chars）
const ILLEGAL_OBJECT_NAME_CHARS: &str = "`~!$%^&*|'\"<>?,()=";

/// 清洗服务描述：去掉非法字符，折叠空白
pub fn nagios_safe(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !ILLEGAL_OBJECT_NAME_CHARS.contains(*c))
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Tera 过滤器版本的 [`nagios_safe`]
pub fn nagios_safe_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let text = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("nagios_safe 只能作用于字符串"))?;
    Ok(tera::Value::String(nagios_safe(text)))
}

/// 检查命令模板是否引用了某个占位符
pub fn references_placeholder(template: &str, name: &str) -> bool {
    template.contains(&format!("%({})s", name))
}

/// 替换 `%(name)s` 占位符，`%%` 输出单个 `%`。
///
/// 其余 `%` 原样保留（命令参数里常见 `20%` 这类阈值）。
/// 占位符没有取值时返回 `ConfigSubstitution`，绝不输出残缺的命令。
pub fn substitute(
    template: &str,
    target: &str,
    values: &HashMap<&str, Option<&str>>,
) -> AppResult<String> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('%') {
        output.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if let Some(after) = tail.strip_prefix("%%") {
            output.push('%');
            rest = after;
            continue;
        }

        let placeholder = tail
            .strip_prefix("%(")
            .and_then(|inner| inner.split_once(")s"))
            .filter(|(name, _)| is_placeholder_name(name));

        match placeholder {
            Some((name, after)) => {
                let value = values
                    .get(name)
                    .copied()
                    .flatten()
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| AppError::substitution(target, name))?;
                output.push_str(value);
                rest = after;
            }
            None => {
                output.push('%');
                rest = &tail[1..];
            }
        }
    }

    output.push_str(rest);
    Ok(output)
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values<'a>(pairs: &[(&'a str, Option<&'a str>)]) -> HashMap<&'a str, Option<&'a str>> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_nagios_safe() {
        assert_eq!(nagios_safe("Backup /home (daily)"), "Backup /home daily");
        assert_eq!(nagios_safe("  TSM\n nightly\t'full' "), "TSM nightly full");
        assert_eq!(nagios_safe("a=b, c!d"), "ab cd");
    }

    #[test]
    fn test_substitute_placeholders() {
        let vals = values(&[("management_ip", Some("10.0.0.5")), ("fqdn", Some("srv01"))]);
        assert_eq!(
            substitute("check_ipmi!%(management_ip)s!80%", "srv01", &vals).unwrap(),
            "check_ipmi!10.0.0.5!80%"
        );
        assert_eq!(
            substitute("check_ssh -H %(fqdn)s -w 100%%", "srv01", &vals).unwrap(),
            "check_ssh -H srv01 -w 100%"
        );
    }

    #[test]
    fn test_substitute_missing_value() {
        let vals = values(&[("management_ip", None), ("fqdn", Some("srv02"))]);
        let err = substitute("check_ipmi!%(management_ip)s", "srv02", &vals).unwrap_err();
        assert!(matches!(
            err,
            AppError::ConfigSubstitution { ref target, ref placeholder }
                if target == "srv02" && placeholder == "management_ip"
        ));

        let err = substitute("check_x!%(serial)s", "srv02", &vals).unwrap_err();
        assert!(matches!(err, AppError::ConfigSubstitution { .. }));
    }

    #[test]
    fn test_references_placeholder() {
        assert!(references_placeholder("check_ipmi!%(management_ip)s", "management_ip"));
        assert!(!references_placeholder("check_ipmi!%(fqdn)s", "management_ip"));
    }
}
