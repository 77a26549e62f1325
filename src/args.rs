use crate::config;
use clap::Parser;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Summarize one day of your inbox")]
pub struct Args {
    /// Specify location of config file.
    #[clap(long)]
    pub config: Option<String>,

    /// Day to digest, as YYYY-MM-DD. Defaults to yesterday.
    #[clap(long)]
    pub date: Option<String>,

    /// hostname of IMAP server.
    #[clap(long)]
    pub server: Option<String>,

    /// email address to log in with.
    #[clap(long)]
    pub address: Option<String>,

    /// password or app secret for IMAP authentication.
    #[clap(long)]
    pub secret: Option<String>,

    /// Skip TLS certificate and hostname verification. Only for self-signed
    /// or misconfigured mail servers; this weakens the connection.
    #[clap(long)]
    pub insecure_tls: bool,

    /// Print the fetched headers as JSON lines instead of summarizing.
    #[clap(long)]
    pub no_summary: bool,
}

impl Args {
    /// Command-line arguments win over the config file.
    #[rustfmt::skip]
    pub fn overwrite_config(&self, config: config::Config) -> config::Config {
        let config::Config { connection, tls, summarizer } = config;

        let mut tls = tls.unwrap_or_default();
        if self.insecure_tls {
            tls.insecure_skip_verify = true;
        }

        config::Config {
            connection: config::Connection {
                server  : self.server.as_ref().unwrap_or(&connection.server).clone(),
                address : self.address.as_ref().unwrap_or(&connection.address).clone(),
                secret  : self.secret.as_ref().unwrap_or(&connection.secret).clone(),
            },
            tls: Some(tls),
            summarizer,
        }
    }
}
