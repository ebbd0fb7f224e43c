//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `PAGESTACK__*` 覆盖
//! （双下划线表示嵌套，如 `PAGESTACK__UI__LOAD_TIMEOUT_SECS=10`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub ui: UiSection,
}

/// [ui] 段：预加载目标集与加载超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSection {
    /// 启动阶段需要预加载的页面资源 Key
    pub preload_keys: Vec<String>,
    /// 单次资源加载超时（秒），0 表示不限时
    pub load_timeout_secs: u64,
    /// 导航事件广播通道容量
    pub event_capacity: usize,
}

impl Default for UiSection {
    fn default() -> Self {
        Self {
            preload_keys: Vec::new(),
            load_timeout_secs: default_load_timeout_secs(),
            event_capacity: default_event_capacity(),
        }
    }
}

fn default_load_timeout_secs() -> u64 {
    30
}

fn default_event_capacity() -> usize {
    32
}

pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("PAGESTACK")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert!(cfg.ui.preload_keys.is_empty());
        assert_eq!(cfg.ui.load_timeout_secs, 30);
        assert_eq!(cfg.ui.event_capacity, 32);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            "[ui]\npreload_keys = [\"ui/main\", \"ui/settings\"]\nload_timeout_secs = 5"
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.ui.preload_keys, vec!["ui/main", "ui/settings"]);
        assert_eq!(cfg.ui.load_timeout_secs, 5);
        // 未出现在文件中的字段走默认值
        assert_eq!(cfg.ui.event_capacity, 32);
    }
}
