// ── SftpSession – blocking SSH session + SFTP subsystem ──────────────────────

use crate::sftp::error::from_ssh;
use crate::sftp::types::SftpSettings;
use log::{info, warn};
use remfs_core::{Credential, RemoteError, RemoteResult};
use ssh2::{Session, Sftp};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

/// An authenticated SSH session with its SFTP channel. All methods block.
pub struct SftpSession {
    pub(crate) session: Session,
    pub(crate) sftp: Sftp,
    #[allow(dead_code)] // held to keep the TCP connection alive
    tcp: TcpStream,
    pub host: String,
    pub remote_home: Option<String>,
    pub auth_method: String,
}

impl SftpSession {
    // ── Connect ──────────────────────────────────────────────────────────────

    pub fn connect(settings: &SftpSettings) -> RemoteResult<Self> {
        let addr = format!("{}:{}", settings.host, settings.port);
        info!("SFTP connecting to {}", addr);

        let sock_addr = addr
            .to_socket_addrs()
            .map_err(|e| RemoteError::connection(format!("Cannot resolve '{}': {}", addr, e)))?
            .next()
            .ok_or_else(|| RemoteError::connection(format!("No address for '{}'", addr)))?;

        let tcp = TcpStream::connect_timeout(&sock_addr, Duration::from_secs(settings.timeout_secs))
            .map_err(|e| RemoteError::connection(format!("TCP connection to {} failed: {}", addr, e)))?;

        let mut session = Session::new()
            .map_err(|e| RemoteError::connection(format!("Failed to create SSH session: {}", e)))?;
        session.set_tcp_stream(
            tcp.try_clone()
                .map_err(|e| RemoteError::connection(e.to_string()))?,
        );
        session.set_timeout((settings.timeout_secs * 1000) as u32);
        session
            .handshake()
            .map_err(|e| RemoteError::connection(format!("SSH handshake failed: {}", e)))?;

        // ── Authentication ───────────────────────────────────────────────────

        let auth_method = authenticate(&session, settings)?;
        if !session.authenticated() {
            return Err(RemoteError::connection(
                "Authentication failed – not authenticated after auth attempt",
            ));
        }
        info!("SFTP authenticated to {} via {}", addr, auth_method);

        session.set_keepalive(
            settings.keepalive_interval_secs > 0,
            settings.keepalive_interval_secs as u32,
        );
        session.set_timeout((settings.io_timeout_secs * 1000) as u32);

        let sftp = session
            .sftp()
            .map_err(|e| RemoteError::connection(format!("SFTP subsystem unavailable: {}", e)))?;

        let remote_home = settings.initial_directory.clone().or_else(|| {
            sftp.realpath(Path::new("."))
                .ok()
                .map(|p| p.to_string_lossy().to_string())
        });

        Ok(Self {
            session,
            sftp,
            tcp,
            host: settings.host.clone(),
            remote_home,
            auth_method,
        })
    }

    /// Liveness: resolve "." through the SFTP channel.
    pub fn probe(&self) -> RemoteResult<()> {
        self.sftp
            .realpath(Path::new("."))
            .map(|_| ())
            .map_err(|e| RemoteError::transient(format!("realpath(.) failed: {}", from_ssh(e).message)))
    }

    pub fn disconnect(self) {
        if let Err(e) = self.session.disconnect(None, "Client disconnecting", None) {
            warn!("SFTP disconnect from {} was not clean: {}", self.host, e);
        }
        info!("SFTP session to {} closed", self.host);
    }
}

// ── Authentication helpers ───────────────────────────────────────────────────

fn authenticate(session: &Session, settings: &SftpSettings) -> RemoteResult<String> {
    let user = settings.username.as_str();

    match &settings.credential {
        Credential::PrivateKey {
            private_key,
            passphrase,
        } => {
            session
                .userauth_pubkey_memory(user, None, private_key, passphrase.as_deref())
                .map_err(|e| RemoteError::connection(format!("Public-key auth failed: {}", e)))?;
            if session.authenticated() {
                return Ok("publickey".to_string());
            }
        }
        Credential::Password { password } => {
            if session.userauth_password(user, password).is_ok() && session.authenticated() {
                return Ok("password".to_string());
            }

            // Keyboard-interactive fallback: answer every prompt with the password.
            struct PasswordPrompt<'a>(&'a str);

            impl ssh2::KeyboardInteractivePrompt for PasswordPrompt<'_> {
                fn prompt(
                    &mut self,
                    _username: &str,
                    _instructions: &str,
                    prompts: &[ssh2::Prompt],
                ) -> Vec<String> {
                    prompts.iter().map(|_| self.0.to_string()).collect()
                }
            }

            let mut prompt = PasswordPrompt(password);
            if session
                .userauth_keyboard_interactive(user, &mut prompt)
                .is_ok()
                && session.authenticated()
            {
                return Ok("keyboard-interactive".to_string());
            }
        }
        Credential::Anonymous => {
            if settings.use_agent {
                if let Ok(mut agent) = session.agent() {
                    if agent.connect().is_ok() && agent.list_identities().is_ok() {
                        for identity in agent.identities().unwrap_or_default() {
                            if agent.userauth(user, &identity).is_ok() {
                                return Ok("agent".to_string());
                            }
                        }
                    }
                }
            }

            if let Some(ssh_dir) = dirs::home_dir().map(|h| h.join(".ssh")) {
                for name in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                    let path = ssh_dir.join(name);
                    if path.exists()
                        && session.userauth_pubkey_file(user, None, &path, None).is_ok()
                        && session.authenticated()
                    {
                        return Ok(format!("publickey-default({})", name));
                    }
                }
            }
        }
    }

    Err(RemoteError::connection(format!(
        "No authentication method succeeded for {}@{}",
        user, settings.host
    )))
}
