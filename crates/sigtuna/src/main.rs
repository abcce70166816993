#![forbid(unsafe_code)]

//! Sigtuna CLI — compute and verify streaming digests over files.

use clap::{Parser, Subcommand};
use sigtuna_core::{algorithm, ns, Error};
use sigtuna_transforms::{
    DigestMethod, DigestMode, DigestTransform, Transform, TransformChain, TransformStatus,
};
use sigtuna_xml::Element;
use std::cell::RefCell;
use std::path::PathBuf;
use std::process;
use std::rc::Rc;

#[derive(Parser)]
#[command(
    name = "sigtuna",
    about = "Sigtuna — streaming digest transforms for XML Security",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a file's digest and print it as a DigestValue element
    Digest {
        /// Input file
        file: PathBuf,

        /// Digest algorithm URI
        #[arg(short, long, default_value = algorithm::SHA256)]
        algorithm: String,

        /// Load raw HMAC key (binary file)
        #[arg(long = "hmac-key")]
        hmac_key: Option<PathBuf>,

        /// Truncate the output to this many bits (keyed digests only)
        #[arg(long = "output-length")]
        output_length: Option<u32>,
    },

    /// Verify a file against a base64 digest value
    Verify {
        /// Input file
        file: PathBuf,

        /// Expected digest value, base64
        #[arg(short = 'd', long = "digest-value")]
        digest_value: String,

        /// Digest algorithm URI
        #[arg(short, long, default_value = algorithm::SHA256)]
        algorithm: String,

        /// Load raw HMAC key (binary file)
        #[arg(long = "hmac-key")]
        hmac_key: Option<PathBuf>,

        /// Truncate the output to this many bits (keyed digests only)
        #[arg(long = "output-length")]
        output_length: Option<u32>,
    },
}

fn main() {
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(true) => 0,
        Ok(false) => {
            eprintln!("FAIL");
            1
        }
        Err(e) => {
            eprintln!("error: {e}");
            2
        }
    };
    process::exit(code);
}

fn run(cli: Cli) -> Result<bool, Error> {
    match cli.command {
        Commands::Digest {
            file,
            algorithm,
            hmac_key,
            output_length,
        } => {
            let transform =
                build_transform(&algorithm, DigestMode::Sign, hmac_key.as_deref(), output_length)?;
            let shared = Rc::new(RefCell::new(transform));
            digest_file(&file, shared.clone())?;

            let mut node = Element::new(ns::node::DIGEST_VALUE);
            borrow_transform(&shared)?.sign_node(&mut node, true)?;
            println!("{}", node.to_xml());
            Ok(true)
        }
        Commands::Verify {
            file,
            digest_value,
            algorithm,
            hmac_key,
            output_length,
        } => {
            let transform = build_transform(
                &algorithm,
                DigestMode::Verify,
                hmac_key.as_deref(),
                output_length,
            )?;
            let shared = Rc::new(RefCell::new(transform));
            digest_file(&file, shared.clone())?;

            let mut node = Element::new(ns::node::DIGEST_VALUE);
            node.set_text(&digest_value);
            let status = borrow_transform(&shared)?.verify_node(&node)?;
            if status == TransformStatus::Succeeded {
                println!("OK");
                Ok(true)
            } else {
                Ok(false)
            }
        }
    }
}

/// Create a digest transform, applying CLI configuration and key material.
fn build_transform(
    uri: &str,
    mode: DigestMode,
    hmac_key: Option<&std::path::Path>,
    output_length: Option<u32>,
) -> Result<DigestTransform, Error> {
    let method = DigestMethod::find(uri)?;
    let mut transform = method.create(mode)?;
    if let Some(bits) = output_length {
        let mut config = Element::new(ns::node::DIGEST_METHOD);
        config.set_attribute(ns::attr::ALGORITHM, uri);
        let mut length = Element::new(ns::node::HMAC_OUTPUT_LENGTH);
        length.set_text(&bits.to_string());
        config.append_child(length);
        transform.read_node(&config)?;
    }
    if let Some(path) = hmac_key {
        let key = std::fs::read(path)?;
        transform.set_key(&key)?;
    }
    Ok(transform)
}

/// Drive the file's bytes through a chain holding the digest transform.
fn digest_file(file: &std::path::Path, shared: Rc<RefCell<DigestTransform>>) -> Result<(), Error> {
    let mut chain = TransformChain::new();
    chain.push_shared(shared);
    let data = std::fs::read(file)?;
    for chunk in data.chunks(8192) {
        chain.push_bytes(chunk)?;
    }
    chain.flush()
}

fn borrow_transform(
    shared: &Rc<RefCell<DigestTransform>>,
) -> Result<std::cell::RefMut<'_, DigestTransform>, Error> {
    shared
        .try_borrow_mut()
        .map_err(|_| Error::Channel("digest transform is already borrowed".into()))
}
