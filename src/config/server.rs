use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("mealpass.db")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.socket_addr().unwrap().port(), 8080);
    }

    #[test]
    fn test_db_path_under_data_dir() {
        let config = ServerConfig {
            data_dir: PathBuf::from("/tmp/mp"),
            ..ServerConfig::default()
        };
        assert_eq!(config.db_path(), PathBuf::from("/tmp/mp/mealpass.db"));
    }
}
