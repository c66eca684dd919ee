use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;

use apksign::{
    archive::{
        dir::DirectoryReader,
        zip::{ZipArchiveReader, ZipArchiveWriter},
        ArchiveReader,
    },
    sign::{sign_archive, SignerConfig},
    signing::Pkcs7Signer,
};

/// apksigner
#[derive(Debug, Parser)]
#[clap(name = "apksigner", version)]
pub struct App {
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Debug, Args)]
struct SignArgs {
    /// the signed archive to write
    #[clap(short, long, default_value = "signed.apk")]
    output: PathBuf,
    /// the private key, PKCS#8 in DER or PEM form
    #[clap(short, long, default_value = "key.pk8")]
    key: PathBuf,
    /// the X.509 certificate for the key, in PEM or DER form
    #[clap(short, long, default_value = "key.x509.pem")]
    cert: PathBuf,
    /// the tool identifier recorded in the Created-By attribute
    #[clap(long)]
    created_by: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Signs an existing archive, replacing any previous signature
    Sign {
        /// the archive to sign
        #[clap(short, long, default_value = "unsigned.apk")]
        input: PathBuf,
        #[clap(flatten)]
        args: SignArgs,
    },
    /// Creates a signed archive from the files in a directory
    ///
    /// A `META-INF/MANIFEST.MF` found in the directory is used like in `sign`.  Without one, the
    /// manifest gets the same default main section as `sign` (`Manifest-Version: 1.0` and
    /// `Created-By: <created-by>`), not the `Built-By`/`Created-By: Android Gradle` pair written
    /// by the Android build tools.
    Pack {
        /// the directory to pack
        #[clap(short, long)]
        input: PathBuf,
        #[clap(flatten)]
        args: SignArgs,
    },
}

fn write_signed(mut reader: impl ArchiveReader, args: &SignArgs) -> Result<()> {
    // Load the key first: a bad key must not leave an empty output file behind
    let signer = Pkcs7Signer::from_files(&args.cert, &args.key)?;

    let mut config = SignerConfig::default();
    if let Some(created_by) = &args.created_by {
        config.created_by = created_by.clone();
    }

    let output = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let mut writer = ZipArchiveWriter::new(BufWriter::new(output));

    let report = sign_archive(&mut reader, &mut writer, &signer, &config)?;
    writer
        .finish()?
        .flush()
        .with_context(|| format!("writing {}", args.output.display()))?;

    info!(
        "wrote {} ({} entries signed)",
        args.output.display(),
        report.signed_entries
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let args = App::parse();

    match args.cmd {
        Command::Sign {
            ref input,
            ref args,
        } => {
            write_signed(ZipArchiveReader::open_path(input)?, args)?;
        }
        Command::Pack {
            ref input,
            ref args,
        } => {
            write_signed(DirectoryReader::open(input)?, args)?;
        }
    }

    Ok(())
}
