use aar::{Archive, Envelope, Kind, PackOptions};
use clap::{Parser, Subcommand};
use std::error::Error;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Parser)]
#[command(name = "aar", about = "Pack files into a single compressed, optionally encrypted archive")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack one or more files into an archive
    Create {
        /// Output archive
        #[arg(short, long)]
        file: PathBuf,
        /// Gzip level (0-9)
        #[arg(short, long, default_value = "6", value_parser = clap::value_parser!(u32).range(0..=9))]
        level: u32,
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
    },
    /// Extract every member, or one member by name
    Extract {
        #[arg(short, long)]
        file: PathBuf,
        /// Extract only this member
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// List archive members without reading their payloads
    List {
        #[arg(short, long)]
        file: PathBuf,
        /// Print the entries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Encrypt an archive in place (writes <file>.enc, removes <file>)
    Encrypt {
        #[arg(short, long)]
        file: PathBuf,
        /// Prompted for when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Decrypt an encrypted archive (strips .enc, removes the encrypted file)
    Decrypt {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Show what kind of file this is and its framing details
    Info {
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse().command) {
        Ok(())  => ExitCode::SUCCESS,
        Err(e) => {
            report(e.as_ref());
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), Box<dyn Error>> {
    match command {

        // ── Create ───────────────────────────────────────────────────────────
        Commands::Create { file, level, inputs } => {
            eprintln!("Creating archive {} with {} files...", file.display(), inputs.len());
            let archive = Archive::create_with(&inputs, &PackOptions { level })?;

            let mut out = BufWriter::new(File::create(&file)?);
            archive.write_to(&mut out)?;
            out.flush()?;

            eprintln!("Archive created successfully.");
            eprintln!("  > Archive size = {} B", archive.total_size());
            eprintln!("  > Header size  = {} B", archive.header().header_length);
            eprintln!("Files in archive:");
            for member in archive.files() {
                eprintln!("  > {} (compressed size = {} B)", member.name(), member.compressed_size());
            }
        }

        // ── Extract ──────────────────────────────────────────────────────────
        Commands::Extract { file, name: Some(name), output_dir } => {
            let mut input = BufReader::new(File::open(&file)?);
            let member = aar::read_member_by_name(&mut input, &name)?;
            let dest = member_path(&output_dir, member.name())?;
            extract_one(&member, &dest)?;
        }
        Commands::Extract { file, name: None, output_dir } => {
            let archive = Archive::read_from(BufReader::new(File::open(&file)?))?;
            // Resolve every destination before writing anything.
            let targets = archive
                .files()
                .iter()
                .map(|m| member_path(&output_dir, m.name()).map(|p| (m, p)))
                .collect::<Result<Vec<_>, _>>()?;
            for (member, dest) in targets {
                extract_one(member, &dest)?;
            }
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { file, json } => {
            let header = Archive::read_header(BufReader::new(File::open(&file)?))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&header.entries)?);
            } else {
                println!("Archive has the following files:");
                for entry in &header.entries {
                    println!("  > {entry}");
                }
            }
        }

        // ── Encrypt ──────────────────────────────────────────────────────────
        Commands::Encrypt { file, password } => {
            let bytes = fs::read(&file)?;
            if aar::detect(&bytes) == Some(Kind::Encrypted) {
                return Err(format!("{} is already encrypted", file.display()).into());
            }
            let archive = Archive::from_bytes(&bytes)?;
            let password = new_password(password)?;
            let envelope = archive.encrypt(&password)?;

            let enc_path = append_extension(&file, "enc");
            write_atomically(&enc_path, |w| Ok(envelope.write_to(w)?))?;
            fs::remove_file(&file)?;
            eprintln!("Archive encrypted successfully to {}", enc_path.display());
        }

        // ── Decrypt ──────────────────────────────────────────────────────────
        Commands::Decrypt { file, password } => {
            let envelope = Envelope::read_from(BufReader::new(File::open(&file)?))?;
            let password = match password {
                Some(p) => p,
                None    => rpassword::prompt_password("Password: ")?,
            };
            let archive = envelope.decrypt_archive(&password)?;

            let dec_path = decrypted_path(&file);
            write_atomically(&dec_path, |w| Ok(archive.write_to(w)?))?;
            fs::remove_file(&file)?;
            eprintln!("Archive decrypted successfully to {}", dec_path.display());
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { file } => {
            let bytes = fs::read(&file)?;
            match aar::detect(&bytes) {
                Some(Kind::Plain) => {
                    let header = Archive::read_header(&bytes[..])?;
                    println!("── Archive ──────────────────────────────────────────────");
                    println!("  Path           {}", file.display());
                    println!("  Header length  {} B", header.header_length);
                    println!("  Members        {}", header.entries.len());
                    println!("  Payload bytes  {} B", header.payload_len());
                    println!("  Total size     {} B", u64::from(header.header_length) + header.payload_len());
                    println!("  File size      {} B", bytes.len());
                }
                Some(Kind::Encrypted) => {
                    let envelope = Envelope::from_bytes(&bytes)?;
                    println!("── Encrypted archive ────────────────────────────────────");
                    println!("  Path           {}", file.display());
                    println!("  Cipher         AES-256-GCM, PBKDF2-HMAC-SHA256 ({} rounds)", aar::crypto::PBKDF2_ROUNDS);
                    println!("  Salt           {}", hex::encode(envelope.salt()));
                    println!("  Nonce          {}", hex::encode(envelope.nonce()));
                    println!("  Ciphertext     {} B", envelope.ciphertext().len());
                }
                None => return Err(format!("{} is not an aar archive", file.display()).into()),
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn report(err: &(dyn Error + 'static)) {
    match err.downcast_ref::<aar::Error>() {
        Some(e) if e.is_authentication_failure() => {
            eprintln!("Error: wrong password, or the encrypted archive has been altered.");
        }
        Some(e) if e.is_corrupt_archive() => {
            eprintln!("Error: the archive is corrupt or not an aar file: {e}");
        }
        _ => eprintln!("Error: {err}"),
    }
}

fn extract_one(member: &aar::ArchivedFile, dest: &Path) -> Result<(), Box<dyn Error>> {
    eprintln!("Extracting {}...", member.name());
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(File::create(dest)?);
    member.write_decompressed(&mut out)?;
    out.flush()?;
    Ok(())
}

/// Map a member name under `dest`. Leading `/` or drive prefixes are
/// dropped; `..` is refused.
fn member_path(dest: &Path, name: &str) -> Result<PathBuf, Box<dyn Error>> {
    let mut out = dest.to_path_buf();
    let mut pushed = false;
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => {
                out.push(part);
                pushed = true;
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                return Err(format!("refusing to extract '{name}': it escapes the output directory").into());
            }
        }
    }
    if !pushed {
        return Err(format!("refusing to extract member with empty name '{name}'").into());
    }
    Ok(out)
}

fn new_password(given: Option<String>) -> Result<String, Box<dyn Error>> {
    let password = match given {
        Some(p) => p,
        None => {
            let first = rpassword::prompt_password("Password: ")?;
            let again = rpassword::prompt_password("Confirm password: ")?;
            if first != again {
                return Err("passwords do not match".into());
            }
            first
        }
    };
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!("the password must be at least {MIN_PASSWORD_LEN} characters long").into());
    }
    Ok(password)
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

/// `archive.aar.enc` → `archive.aar`; anything else gets `.dec` appended.
fn decrypted_path(path: &Path) -> PathBuf {
    match path.extension() {
        Some(ext) if ext == "enc" => path.with_extension(""),
        _ => append_extension(path, "dec"),
    }
}

/// Write through a sibling temporary file and rename it into place, so a
/// failed write never leaves a half-written output behind.
fn write_atomically<F>(path: &Path, write: F) -> Result<(), Box<dyn Error>>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), Box<dyn Error>>,
{
    let tmp = append_extension(path, "tmp");
    let result = write_file(&tmp, write).and_then(|()| fs::rename(&tmp, path).map_err(Into::into));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_file<F>(path: &Path, write: F) -> Result<(), Box<dyn Error>>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), Box<dyn Error>>,
{
    let mut out = BufWriter::new(File::create(path)?);
    write(&mut out)?;
    out.flush()?;
    Ok(())
}
