//! Port 43 WHOIS client.
//!
//! Resolves the registry server for a domain's TLD through the IANA WHOIS
//! service, queries it with the full domain, and hands the free-text reply to
//! [`WhoisParser`].

use crate::{config::Config, errors::WibError, models::DomainWhoisRecord, parser::WhoisParser};
use std::time::Duration;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};
use tracing::{debug, info};

const READ_CHUNK_SIZE: usize = 64 * 1024;

pub struct Port43WhoisClient {
    bootstrap_server: String,
    port: u16,
    timeout: Duration,
    max_response_size: usize,
    parser: WhoisParser,
}

impl Port43WhoisClient {
    pub fn new(config: &Config) -> Self {
        Self {
            bootstrap_server: config.whois_bootstrap_server.clone(),
            port: config.whois_port,
            timeout: config.timeout(),
            max_response_size: config.max_response_size,
            parser: WhoisParser::new(),
        }
    }

    /// `Ok(None)` when no registry server is known for the TLD or the registry
    /// sent nothing back. Connection and timeout failures are errors.
    pub async fn fetch(&self, domain: &str) -> Result<Option<DomainWhoisRecord>, WibError> {
        let server = match self.resolve_server(domain).await? {
            Some(server) => server,
            None => {
                debug!("No WHOIS server referral for {}", domain);
                return Ok(None);
            }
        };

        info!("Querying WHOIS server {} for {}", server, domain);
        let text = self.query(&server, domain).await?;
        if text.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(self.parser.parse(domain, &text)))
    }

    /// Ask the bootstrap server which registry serves the domain's TLD.
    pub async fn resolve_server(&self, domain: &str) -> Result<Option<String>, WibError> {
        let tld = extract_tld(domain);
        let response = self.query(&self.bootstrap_server, &tld).await?;
        Ok(find_referral(&response))
    }

    async fn query(&self, server: &str, query: &str) -> Result<String, WibError> {
        let mut stream = timeout(self.timeout, TcpStream::connect((server, self.port))).await??;

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY: {}", e);
        }

        let query_line = format!("{}\r\n", query);
        timeout(self.timeout, stream.write_all(query_line.as_bytes())).await??;
        timeout(self.timeout, stream.flush()).await??;

        let mut buffer = vec![0u8; READ_CHUNK_SIZE];
        let mut response = Vec::new();

        loop {
            match timeout(self.timeout, stream.read(&mut buffer)).await?? {
                0 => break,
                n => {
                    response.extend_from_slice(&buffer[..n]);
                    if response.len() >= self.max_response_size {
                        debug!("WHOIS response from {} hit the {} byte cap", server, self.max_response_size);
                        response.truncate(self.max_response_size);
                        break;
                    }
                }
            }
        }

        if let Err(e) = stream.shutdown().await {
            debug!("Error closing connection to {}: {}", server, e);
        }

        Ok(decode_reply(response))
    }
}

/// UTF-8 when valid, otherwise Latin-1, where every byte maps to the same code point.
fn decode_reply(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().into_iter().map(char::from).collect(),
    }
}

/// Last dot-separated label of the domain.
fn extract_tld(domain: &str) -> String {
    let domain = domain.trim().trim_matches('.').to_lowercase();
    domain.rsplit('.').next().unwrap_or_default().to_string()
}

// A `whois:` line anywhere in the response takes priority over `refer:`.
fn find_referral(response: &str) -> Option<String> {
    ["whois:", "refer:"].iter().find_map(|prefix| {
        response.lines().find_map(|line| {
            if !line.to_lowercase().starts_with(prefix) {
                return None;
            }
            line.split_once(':')
                .map(|(_, server)| server.trim())
                .filter(|server| !server.is_empty())
                .map(str::to_string)
        })
    })
}
