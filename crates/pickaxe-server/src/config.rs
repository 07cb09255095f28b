use serde::Deserialize;
use std::path::Path;

/// One entry of `serverConfig.resourcePacks` (spec.md §6).
#[derive(Debug, Clone, Deserialize)]
pub struct ResourcePackEntry {
    pub uuid: uuid::Uuid,
    pub url: String,
    pub hash: String,
    #[serde(default)]
    pub forced: bool,
    #[serde(default)]
    pub prompt_message: Option<String>,
}

/// One entry of `serverConfig.serverLinks` (spec.md §6).
#[derive(Debug, Clone, Deserialize)]
pub struct ServerLinkEntry {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_players")]
    pub max_players: u32,
    #[serde(default = "default_motd")]
    pub motd: String,
    #[serde(default)]
    pub online_mode: bool,
    #[serde(default = "default_view_distance")]
    pub view_distance: u32,
    /// Whether Player Info Update must carry an Initialize-Chat block and
    /// Player Chat Message must be signed (spec.md §4.8, §6).
    #[serde(default)]
    pub enable_secure_chat: bool,
    #[serde(default)]
    pub resource_packs: Vec<ResourcePackEntry>,
    #[serde(default)]
    pub server_links: Vec<ServerLinkEntry>,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_bind() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    25565
}

fn default_max_players() -> u32 {
    20
}

fn default_motd() -> String {
    "A Pickaxe Server".into()
}

fn default_view_distance() -> u32 {
    8
}

fn default_data_dir() -> String {
    "resources".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            max_players: default_max_players(),
            motd: default_motd(),
            online_mode: false,
            view_distance: default_view_distance(),
            enable_secure_chat: false,
            resource_packs: Vec::new(),
            server_links: Vec::new(),
            data_dir: default_data_dir(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: ServerConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::info!("No config file found at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let config = ServerConfig::load(Path::new("/nonexistent/server.toml")).unwrap();
        assert_eq!(config.port, 25565);
        assert!(!config.online_mode);
        assert!(!config.enable_secure_chat);
    }

    #[test]
    fn test_parses_resource_packs_and_links() {
        let toml_str = r#"
            port = 25566
            enable_secure_chat = true

            [[resource_packs]]
            uuid = "00000000-0000-0000-0000-000000000001"
            url = "https://example.com/pack.zip"
            hash = "0000000000000000000000000000000000000a"
            forced = true

            [[server_links]]
            label = "website"
            url = "https://example.com"
        "#;
        let config: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.port, 25566);
        assert!(config.enable_secure_chat);
        assert_eq!(config.resource_packs.len(), 1);
        assert!(config.resource_packs[0].forced);
        assert_eq!(config.server_links[0].label, "website");
    }
}
