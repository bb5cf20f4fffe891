use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::Path;
use std::process::Command;

const EBPF_PACKAGE: &str = "tcpdrop-ebpf";
const EBPF_BINARY: &str = "tcpdrop";

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Parser)]
enum Cmd {
    /// Cross-compile the kernel program
    BuildEbpf {
        #[arg(long, default_value = "bpfel-unknown-none")]
        target: String,
    },
    /// Build everything and run tcpdrop under sudo
    Run {
        #[arg(long, default_value = "bpfel-unknown-none")]
        target: String,
        /// Arguments passed to tcpdrop, e.g. `-- terminal 10`
        #[arg(last = true)]
        run_args: Vec<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Cmd::BuildEbpf { target } => build_ebpf(&target)?,
        Cmd::Run { target, run_args } => run(&target, &run_args)?,
    }

    Ok(())
}

fn build_ebpf(target: &str) -> Result<()> {
    // Debug builds pull in formatting code the BPF linker rejects
    let status = Command::new("cargo")
        .arg("+nightly")
        .arg("build")
        .arg("--package")
        .arg(EBPF_PACKAGE)
        .arg("--target")
        .arg(target)
        .arg("-Z")
        .arg("build-std=core")
        .arg("--release")
        .status()
        .context("Failed to build eBPF program")?;

    if !status.success() {
        bail!("Failed to build eBPF program");
    }

    let object = Path::new("target").join(target).join("release").join(EBPF_BINARY);
    println!("✓ eBPF program built successfully");
    println!("  Object: {}", object.display());

    Ok(())
}

fn run(target: &str, run_args: &[String]) -> Result<()> {
    build_ebpf(target)?;

    let status = Command::new("cargo")
        .args(["build", "--release", "--package", "tcpdrop"])
        .status()
        .context("Failed to build tcpdrop")?;
    if !status.success() {
        bail!("Failed to build tcpdrop");
    }

    let object = Path::new("target").join(target).join("release").join(EBPF_BINARY);
    let status = Command::new("sudo")
        .arg("-E")
        .arg("target/release/tcpdrop")
        .args(run_args)
        .arg("--bpf-object")
        .arg(&object)
        .status()
        .context("Failed to run tcpdrop")?;

    if !status.success() {
        bail!("tcpdrop exited with {status}");
    }
    Ok(())
}
