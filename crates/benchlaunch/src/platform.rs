use std::process::Command;
use sysinfo::System;

/// Source of host CPU facts used to size thread pools.
pub trait Platform {
    fn num_cores_per_socket(&self) -> usize;
}

/// Core count detected on the running host.
///
/// `lscpu` is consulted first since it reports cores per socket; when it is
/// missing the physical core count from `sysinfo` is treated as one socket.
#[derive(Debug, Clone, Copy)]
pub struct HostPlatform {
    cores_per_socket: usize,
}

impl HostPlatform {
    pub fn detect() -> Self {
        let cores_per_socket = Self::from_lscpu()
            .or_else(Self::from_sysinfo)
            .unwrap_or_else(|| {
                tracing::warn!("could not determine CPU topology, assuming a single core");
                1
            });
        tracing::debug!(cores_per_socket, "detected cpu topology");
        HostPlatform { cores_per_socket }
    }

    fn from_lscpu() -> Option<usize> {
        let output = Command::new("lscpu").output().ok()?;
        if !output.status.success() {
            return None;
        }
        parse_lscpu(&String::from_utf8_lossy(&output.stdout))
    }

    fn from_sysinfo() -> Option<usize> {
        let sys = System::new();
        sys.physical_core_count().map(|cores| cores.max(1))
    }
}

impl Platform for HostPlatform {
    fn num_cores_per_socket(&self) -> usize {
        self.cores_per_socket
    }
}

/// A platform with a known core count, for callers that already know the host.
#[derive(Debug, Clone, Copy)]
pub struct FixedPlatform {
    cores_per_socket: usize,
}

impl FixedPlatform {
    pub fn new(cores_per_socket: usize) -> Self {
        FixedPlatform { cores_per_socket }
    }
}

impl Platform for FixedPlatform {
    fn num_cores_per_socket(&self) -> usize {
        self.cores_per_socket
    }
}

/// Pull the cores-per-socket count out of `lscpu` text output.
pub fn parse_lscpu(output: &str) -> Option<usize> {
    output
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim() == "Core(s) per socket")
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .filter(|cores| *cores > 0)
}
