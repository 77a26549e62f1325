use crate::config::{Connection, TlsOptions};
use anyhow::{anyhow, Result};
use native_tls::{TlsConnector, TlsStream};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const PORT_IMAPS: u16 = 993;
const PORT_IMAP: u16 = 143;

pub type ImapSession = imap::Session<TlsStream<TcpStream>>;

#[derive(Error, Debug)]
pub enum ConnectError {
    /// Both the implicit-TLS and the STARTTLS paths failed. Carries the
    /// STARTTLS attempt's failure text, since that was the last one tried.
    #[error("could not reach the mail server: {0}")]
    Transport(String),

    /// The server rejected the login; the server-reported reason is kept
    /// verbatim for display.
    #[error("authentication failed: {0}")]
    Auth(String),
}

/// Opens an authenticated session with INBOX selected.
///
/// The transport is negotiated in two steps: implicit TLS on port 993 first,
/// and on any failure there (resolve, TCP, handshake, greeting) a plaintext
/// connection to port 143 upgraded in-band with STARTTLS. Credentials go
/// through the imap crate's LOGIN, so a secret full of quotes or backslashes
/// can't corrupt the command.
pub fn connect(conn: &Connection, tls: &TlsOptions) -> Result<ImapSession, ConnectError> {
    connect_with_ports(conn, tls, PORT_IMAPS, PORT_IMAP)
}

fn connect_with_ports(
    conn: &Connection,
    tls: &TlsOptions,
    tls_port: u16,
    starttls_port: u16,
) -> Result<ImapSession, ConnectError> {
    let connector =
        tls_connector(tls).map_err(|e| ConnectError::Transport(e.to_string()))?;
    let timeout = Duration::from_secs(tls.timeout_secs());

    let client = match connect_implicit_tls(&conn.server, tls_port, &connector, timeout) {
        Ok(client) => client,
        Err(e) => {
            debug!(
                "implicit TLS to {}:{} failed ({}), trying STARTTLS on {}",
                conn.server, tls_port, e, starttls_port
            );
            imap::connect_starttls(
                (conn.server.as_str(), starttls_port),
                conn.server.as_str(),
                &connector,
            )
            .map_err(|e| ConnectError::Transport(e.to_string()))?
        }
    };

    // On rejection the client is dropped here, which closes the socket.
    let mut session = client
        .login(&conn.address, &conn.secret)
        .map_err(|e| ConnectError::Auth(e.0.to_string()))?;

    if let Err(e) = session.select("INBOX") {
        let _ = session.logout();
        return Err(ConnectError::Transport(format!(
            "could not select inbox: {}",
            e
        )));
    }

    Ok(session)
}

fn tls_connector(opts: &TlsOptions) -> Result<TlsConnector, native_tls::Error> {
    let mut builder = TlsConnector::builder();

    if opts.insecure_skip_verify {
        builder.danger_accept_invalid_certs(true);
        builder.danger_accept_invalid_hostnames(true);
    }

    builder.build()
}

/// The implicit-TLS path builds its own socket so the connect/read/write
/// timeouts can be set before the handshake. `connect_starttls` owns its
/// socket, so the fallback path keeps the OS defaults.
fn connect_implicit_tls(
    server: &str,
    port: u16,
    connector: &TlsConnector,
    timeout: Duration,
) -> Result<imap::Client<TlsStream<TcpStream>>> {
    let addr = (server, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| anyhow!("no addresses resolved for {}", server))?;

    let tcp = TcpStream::connect_timeout(&addr, timeout)?;
    tcp.set_read_timeout(Some(timeout))?;
    tcp.set_write_timeout(Some(timeout))?;

    let stream = connector.connect(server, tcp)?;
    let mut client = imap::Client::new(stream);
    client.read_greeting()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    fn conn(server: &str) -> Connection {
        Connection {
            server: server.to_string(),
            address: "user@example.com".to_string(),
            secret: "hunter2".to_string(),
        }
    }

    fn quick_tls() -> TlsOptions {
        TlsOptions {
            insecure_skip_verify: false,
            timeout_secs: Some(2),
        }
    }

    /// Bind and immediately drop a listener to get a port nothing answers on.
    fn dead_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener
            .local_addr()
            .unwrap()
            .port()
    }

    #[test]
    fn empty_hostname_is_a_transport_error() {
        let err = connect_with_ports(&conn(""), &quick_tls(), 993, 143).unwrap_err();
        assert!(matches!(err, ConnectError::Transport(_)));
    }

    #[test]
    fn falls_back_to_starttls_when_tls_port_is_dead() {
        // Nothing listens on the implicit-TLS port; the STARTTLS port accepts
        // and hangs up, so the fallback is observably attempted and the final
        // error comes from the second path.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let starttls_port = listener
            .local_addr()
            .unwrap()
            .port();

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let accepted = listener.accept().is_ok();
            tx.send(accepted)
                .unwrap();
        });

        let err = connect_with_ports(&conn("127.0.0.1"), &quick_tls(), dead_port(), starttls_port)
            .unwrap_err();

        assert!(matches!(err, ConnectError::Transport(_)));
        assert!(rx
            .recv_timeout(Duration::from_secs(5))
            .unwrap());
    }

    #[test]
    fn permissive_connector_builds() {
        let opts = TlsOptions {
            insecure_skip_verify: true,
            timeout_secs: None,
        };
        tls_connector(&opts).unwrap();
    }
}
