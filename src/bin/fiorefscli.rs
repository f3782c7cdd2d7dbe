//! Minimal demonstration client for the `fiorefs` library: formats (or
//! mounts) a host-file-backed volume and runs a handful of smoke
//! operations against it. Not part of the core — a thin caller of the
//! public `Filesystem` API, in the spirit of the retrieval pack's own
//! `mkfs`-style tools.

use std::process::ExitCode;

use clap::Parser;
use fiorefs::{FileBlockDevice, FsError, OpenFlags, Result};

/// Format or mount a fiorefs volume and run a short smoke test.
#[derive(Parser, Debug)]
#[command(name = "fiorefscli", version, about)]
struct Args {
    /// Path to the backing volume image.
    #[arg(long, default_value = "fiore.img")]
    image: String,

    /// Block size in bytes, used only when the image is freshly formatted.
    #[arg(long, default_value_t = fiorefs::param::DEFAULT_BLOCK_SIZE)]
    block_size: u64,

    /// Number of blocks, used only when the image is freshly formatted.
    #[arg(long, default_value_t = 2048)]
    blocks: u64,
}

/// Maps a `Result<T, FsError>` to the legacy "negative on failure"
/// convention described in the external interfaces, for illustration
/// only — this shim is a client concern, not core behavior.
fn legacy<T>(r: Result<T>) -> std::result::Result<T, i64> {
    r.map_err(|e| e.legacy_code())
}

fn run() -> Result<()> {
    let args = Args::parse();
    let device = FileBlockDevice::open(&args.image, args.block_size, args.blocks)?;
    let mut fs = fiorefs::Filesystem::mount(Box::new(device))?;

    log::info!("mounted {} ({} x {} bytes)", args.image, args.blocks, args.block_size);

    match fs.mkdir("demo") {
        Ok(()) => log::info!("created /demo"),
        Err(FsError::AlreadyExists(_)) => log::debug!("/demo already exists, reusing it"),
        Err(e) => return Err(e),
    }
    fs.setcwd("demo")?;

    let fd = fs.open("hello.txt", OpenFlags::WRITE)?;
    match fs.write(fd, b"hello from fiorefscli\n") {
        Ok(_) => {
            fs.close(fd)?;
            log::info!("wrote hello.txt");
        }
        Err(FsError::AlreadyExists(_)) => {
            fs.close(fd)?;
            log::debug!("hello.txt already exists, skipping write");
        }
        Err(e) => return Err(e),
    }

    fs.opendir(".")?;
    while let Some(entry) = fs.readdir()? {
        log::info!("  {} ({} bytes)", entry.name(), entry.size_bytes());
    }
    fs.closedir()?;

    log::info!("cwd is {}", fs.getcwd()?);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    match legacy(run()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => {
            eprintln!("fiorefscli: operation failed (code {code})");
            ExitCode::FAILURE
        }
    }
}
