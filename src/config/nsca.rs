use serde::{Deserialize, Serialize};

/// NSCA 加密方式（仅支持 send_nsca 的 0 与 1）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NscaEncryption {
    /// 0: 不加密
    None,
    /// 1: 简单异或
    Xor,
}

/// NSCA 服务端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NscaConfig {
    /// Nagios 主机地址
    pub host: String,
    /// NSCA 端口
    pub port: u16,
    /// 加密方式
    pub encryption: NscaEncryption,
    /// 加密口令（仅 XOR 使用）
    #[serde(default)]
    pub password: String,
}

impl Default for NscaConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5667,
            encryption: NscaEncryption::Xor,
            password: String::new(),
        }
    }
}

impl NscaConfig {
    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("NSCA host 不能为空".to_string());
        }

        if self.port == 0 {
            return Err("NSCA 端口不能为0".to_string());
        }

        if self.encryption == NscaEncryption::None && !self.password.is_empty() {
            return Err("未启用加密时不应配置口令".to_string());
        }

        Ok(())
    }

    /// 获取 host:port 形式的地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nsca_config_default() {
        let config = NscaConfig::default();
        assert_eq!(config.port, 5667);
        assert_eq!(config.encryption, NscaEncryption::Xor);
        assert_eq!(config.addr(), "localhost:5667");
    }

    #[test]
    fn test_encryption_from_toml() {
        let config: NscaConfig =
            toml::from_str("host = \"nagios\"\nport = 5667\nencryption = \"none\"\n").unwrap();
        assert_eq!(config.encryption, NscaEncryption::None);
        assert!(config.password.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_nsca_config_validation() {
        let mut config = NscaConfig::default();
        assert!(config.validate().is_ok());

        config.host = " ".to_string();
        assert!(config.validate().is_err());

        config.host = "nagios.example.org".to_string();
        config.encryption = NscaEncryption::None;
        config.password = "secret".to_string();
        assert!(config.validate().is_err());
    }
}
