//! Startup status reporting
//!
//! One line per configured transport method on stdout, then a single
//! terminating line once every method has reported. Consumed by a
//! controlling process at startup; steady state never touches this.

use std::net::SocketAddr;

/// Reports per-method listener startup results.
#[derive(Debug, Default)]
pub struct StatusReporter;

impl StatusReporter {
    pub fn new() -> Self {
        Self
    }

    /// A method's listener bound successfully.
    pub fn method_ok(&self, method: &str, addr: SocketAddr) {
        println!("METHOD {} {}", method, addr);
    }

    /// A method's listener failed to start.
    pub fn method_error(&self, method: &str, error: &str) {
        println!("METHOD-ERROR {} {}", method, error);
    }

    /// All configured methods have reported.
    pub fn methods_done(&self) {
        println!("METHODS DONE");
    }
}
