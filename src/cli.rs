//! The CLI surface, implemented with
//! `structopt` derive.

use structopt::StructOpt;

use crate::wire::Proto;

#[derive(Debug, StructOpt)]
#[structopt(name = "wormhole")]
pub enum Wormhole {
    /// Expose a local HTTP service under a public subdomain.
    Http(Tunnel),
    /// Expose a local TCP service under a public subdomain.
    Tcp(Tunnel),
}

impl Wormhole {
    pub fn proto(&self) -> Proto {
        match self {
            Wormhole::Http(_) => Proto::Http,
            Wormhole::Tcp(_) => Proto::Tcp,
        }
    }

    pub fn tunnel(&self) -> &Tunnel {
        match self {
            Wormhole::Http(tunnel) | Wormhole::Tcp(tunnel) => tunnel,
        }
    }
}

#[derive(Debug, StructOpt)]
pub struct Tunnel {
    /// The subdomain to register.
    #[structopt(long)]
    pub name: String,

    /// The local `host:port` to forward accepted connections to.
    #[structopt(long)]
    pub target_address: String,

    /// The rendezvous server to dial.
    #[structopt(long)]
    pub address: Option<String>,

    /// Request a live metrics stream from the server.
    #[structopt(long)]
    pub metrics: bool,

    /// Treat the local target as speaking TLS with an unverifiable
    /// (e.g. self-signed) certificate.
    #[structopt(long)]
    pub target_tls: bool,
}
