//! Codec configuration
//!
//! Defaults applied when packets are constructed or received. Header layouts
//! and protocol numbers are fixed per codec and are not part of this.

/// Default Time to Live written into new IPv4 headers
pub const DEFAULT_TTL: u8 = 64;

/// Default maximum length of an inbound datagram
pub const DEFAULT_RECEIVE_LIMIT: usize = 16384;

/// Default TCP window advertised by built segments
pub const DEFAULT_TCP_WINDOW: u16 = 65535;

/// Tunables shared by the packet codecs and the datagram builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// TTL written by `Ipv4Packet::new`
    pub default_ttl: u8,
    /// Inbound slices longer than this are clamped before parsing
    pub receive_limit: usize,
    /// Window written into TCP segments by the builder
    pub tcp_window: u16,
}

impl CodecConfig {
    pub fn new() -> Self {
        CodecConfig {
            default_ttl: DEFAULT_TTL,
            receive_limit: DEFAULT_RECEIVE_LIMIT,
            tcp_window: DEFAULT_TCP_WINDOW,
        }
    }

    /// Set the default TTL
    pub fn with_default_ttl(mut self, ttl: u8) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Set the receive limit
    pub fn with_receive_limit(mut self, limit: usize) -> Self {
        self.receive_limit = limit;
        self
    }

    /// Set the TCP window
    pub fn with_tcp_window(mut self, window: u16) -> Self {
        self.tcp_window = window;
        self
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self::new()
    }
}
