//! # eBPF Program Loading and Attachment
//!
//! Loads the compiled drop tracepoint program, configures it for the running
//! kernel and attaches it.
//!
//! ## Sequence
//!
//! 1. [`bump_memlock_rlimit()`] - older kernels charge BPF maps to `RLIMIT_MEMLOCK`
//! 2. [`DropProbe::load()`] - load bytecode (embedded or from `--bpf-object`)
//! 3. [`DropProbe::configure()`] - write `kfree_skb` field offsets to `CONFIG`
//! 4. [`DropProbe::attach()`] - attach to `skb/kfree_skb`
//! 5. [`DropProbe::take_events()`] - hand the ring buffer to the ingestion loop
//!
//! Everything here runs before ingestion starts; any failure is fatal.

pub mod format;

use aya::{
    maps::{HashMap, MapData, PerCpuArray, RingBuf},
    programs::TracePoint,
    Ebpf,
};
use log::{debug, info};
use std::path::Path;
use tcpdrop_common::{
    CONFIG_LOCATION_OFFSET, CONFIG_MAP, CONFIG_REASON_OFFSET, DISCARDS_MAP, EVENTS_MAP,
    PROGRAM_NAME,
};

use crate::domain::ProbeError;

pub use format::{DropFieldOffsets, FieldLayout};

/// Tracepoint the program attaches to
pub const TRACEPOINT_CATEGORY: &str = "skb";
pub const TRACEPOINT_NAME: &str = "kfree_skb";

/// Default location of the compiled kernel program
pub const DEFAULT_BPF_OBJECT: &str = "target/bpfel-unknown-none/release/tcpdrop";

/// Lift the locked-memory limit for kernels that still account BPF maps there
///
/// Failure is not fatal: kernels 5.11+ use memory cgroups instead.
pub fn bump_memlock_rlimit() {
    let rlim = libc::rlimit { rlim_cur: libc::RLIM_INFINITY, rlim_max: libc::RLIM_INFINITY };
    #[allow(unsafe_code)]
    let ret = unsafe { libc::setrlimit(libc::RLIMIT_MEMLOCK, &rlim) };
    if ret != 0 {
        debug!("Failed to remove memlock limit: {}", std::io::Error::last_os_error());
    }
}

/// The loaded drop tracepoint program and its maps
pub struct DropProbe {
    bpf: Ebpf,
}

impl DropProbe {
    /// Load the eBPF program
    ///
    /// With the `embedded` feature the bytecode is compiled into the binary and
    /// `object` is ignored.
    ///
    /// # Errors
    /// Returns an error if the object cannot be read or the kernel rejects it
    pub fn load(object: &Path) -> Result<Self, ProbeError> {
        #[cfg(feature = "embedded")]
        let bpf = {
            let _ = object;
            info!("Loading embedded eBPF program...");
            Ebpf::load(aya::include_bytes_aligned!(
                "../../../target/bpfel-unknown-none/release/tcpdrop"
            ))?
        };

        #[cfg(not(feature = "embedded"))]
        let bpf = {
            info!("Loading eBPF object from: {}", object.display());
            if !object.exists() {
                return Err(ProbeError::EbpfLoadFailed(format!(
                    "{} not found (build it with `cargo xtask build-ebpf`)",
                    object.display()
                )));
            }
            Ebpf::load_file(object)?
        };

        Ok(Self { bpf })
    }

    /// Tell the kernel program where `location` and `reason` live
    ///
    /// # Errors
    /// Returns an error if the `CONFIG` map is missing or cannot be written
    pub fn configure(&mut self, offsets: DropFieldOffsets) -> Result<(), ProbeError> {
        let mut config: HashMap<_, u32, u64> = HashMap::try_from(
            self.bpf.map_mut(CONFIG_MAP).ok_or(ProbeError::MapNotFound(CONFIG_MAP))?,
        )?;
        config.insert(CONFIG_LOCATION_OFFSET, offsets.location, 0)?;
        config.insert(CONFIG_REASON_OFFSET, offsets.reason, 0)?;

        info!("✓ Field offsets: location={} reason={}", offsets.location, offsets.reason);
        Ok(())
    }

    /// Attach the program to `skb/kfree_skb`
    ///
    /// # Errors
    /// Returns an error if the program is missing, fails verification or
    /// cannot be attached
    pub fn attach(&mut self) -> Result<(), ProbeError> {
        let program: &mut TracePoint = self
            .bpf
            .program_mut(PROGRAM_NAME)
            .ok_or(ProbeError::ProgramNotFound(PROGRAM_NAME))?
            .try_into()?;
        program.load()?;
        program.attach(TRACEPOINT_CATEGORY, TRACEPOINT_NAME).map_err(|e| {
            ProbeError::AttachFailed {
                program: PROGRAM_NAME.to_string(),
                category: TRACEPOINT_CATEGORY.to_string(),
                name: TRACEPOINT_NAME.to_string(),
                error: e.to_string(),
            }
        })?;

        info!("✓ Attached tracepoint: {TRACEPOINT_CATEGORY}/{TRACEPOINT_NAME}");
        Ok(())
    }

    /// Take ownership of the event ring buffer
    ///
    /// # Errors
    /// Returns an error if the map is missing or was already taken
    pub fn take_events(&mut self) -> Result<RingBuf<MapData>, ProbeError> {
        let map = self.bpf.take_map(EVENTS_MAP).ok_or(ProbeError::MapNotFound(EVENTS_MAP))?;
        Ok(RingBuf::try_from(map)?)
    }

    /// Records the kernel lost because the ring buffer was full, summed over CPUs
    ///
    /// # Errors
    /// Returns an error if the counter map cannot be read
    pub fn kernel_discards(&self) -> Result<u64, ProbeError> {
        let discards: PerCpuArray<_, u64> = PerCpuArray::try_from(
            self.bpf.map(DISCARDS_MAP).ok_or(ProbeError::MapNotFound(DISCARDS_MAP))?,
        )?;
        let per_cpu = discards.get(&0, 0)?;
        Ok(per_cpu.iter().sum())
    }
}
