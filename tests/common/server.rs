//! Test server management.
//!
//! Spawns and manages bidstaged instances for integration testing.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

/// Origin every test client presents during the handshake.
pub const ALLOWED_ORIGIN: &str = "http://stage.test";

/// Knobs for the generated config.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub commands_per_second: u32,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            commands_per_second: 1000,
        }
    }
}

/// A test server instance.
pub struct TestServer {
    child: Child,
    port: u16,
    config_path: PathBuf,
    // Removed on drop.
    _data_dir: TempDir,
}

impl TestServer {
    /// Spawn a server with default options.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with(ServerOptions::default(), |_| Ok(())).await
    }

    /// Spawn a server after running `seed` against its config file.
    ///
    /// Seeding happens before the daemon starts so the admin subcommands and
    /// the daemon never contend for the database.
    pub async fn spawn_with<F>(options: ServerOptions, seed: F) -> anyhow::Result<Self>
    where
        F: FnOnce(&Path) -> anyhow::Result<()>,
    {
        let data_dir = tempfile::tempdir()?;
        let port = free_port()?;
        let config_path = data_dir.path().join("config.toml");
        std::fs::write(&config_path, config(port, data_dir.path(), &options))?;

        seed(&config_path)?;

        let child = Command::new(binary())
            .arg(&config_path)
            .env("RUST_LOG", "warn")
            .stdout(Stdio::null())
            .spawn()?;

        let server = Self {
            child,
            port,
            config_path,
            _data_dir: data_dir,
        };
        server.wait_until_ready().await?;
        Ok(server)
    }

    /// Wait until the server is accepting connections.
    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        for _ in 0..50 {
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("Server failed to start within 5 seconds")
    }

    /// WebSocket URL of the server.
    pub fn url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    /// Path of the generated config.
    #[allow(dead_code)]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Connect a client presenting the allowed origin.
    pub async fn connect(&self) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::connect(&self.url(), ALLOWED_ORIGIN).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Run `bidstaged deposit` against a config.
#[allow(dead_code)]
pub fn deposit(config: &Path, host: &str, country: &str, real: i64, bonus: i64) -> anyhow::Result<()> {
    admin(
        config,
        &[
            "deposit",
            host,
            country,
            &real.to_string(),
            &bonus.to_string(),
        ],
    )
}

/// Run `bidstaged patron` against a config.
#[allow(dead_code)]
pub fn patron(config: &Path, id: &str, name: &str) -> anyhow::Result<()> {
    admin(config, &["patron", id, name])
}

fn admin(config: &Path, args: &[&str]) -> anyhow::Result<()> {
    let (subcommand, rest) = args
        .split_first()
        .ok_or_else(|| anyhow::anyhow!("missing subcommand"))?;
    let output = Command::new(binary())
        .arg(subcommand)
        .arg(config)
        .args(rest)
        .env("RUST_LOG", "warn")
        .output()?;
    if !output.status.success() {
        anyhow::bail!(
            "bidstaged {subcommand} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(())
}

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_bidstaged"))
}

fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

fn config(port: u16, data_dir: &Path, options: &ServerOptions) -> String {
    format!(
        r#"
[server]
name = "test.stage"
metrics_port = 0

[listen]
address = "127.0.0.1:{port}"
allow_origins = ["{origin}"]

[database]
path = "{db}"

[limits]
commands_per_second = {cps}

[[auth.tokens]]
token = "tok-alice"
host_id = "alice"

[[auth.tokens]]
token = "tok-bob"
host_id = "bob"

[[countries]]
code = "CO"
minimo_bloqueado = 20000
costo_extra_generosa = 2000
montos = [{{ id = "m15", value = 15000 }}, {{ id = "m90", value = 90000 }}]
modos = [{{ id = "normal" }}, {{ id = "generous" }}]
tabla_bonos = [
    {{ monto = "m15", modo = "normal", songs = 1, connections = 0 }},
    {{ monto = "m15", modo = "generous", songs = 3, connections = 1 }},
    {{ monto = "m90", modo = "normal", songs = 8, connections = 2 }},
]
"#,
        origin = ALLOWED_ORIGIN,
        db = data_dir.join("test.db").display(),
        cps = options.commands_per_second,
    )
}
