use std::env;
use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use diskimg::geometry::template_names;
use diskimg::{create_file, plan, ErrorCode, ImageRequest};

const DEFAULT_FILENAME: &str = "IMGMAKE.IMG";

const USAGE: &str = "Creates floppy or hard disk images.
Usage: diskimg [-?] [file] [-t type] [[-size size] | [-chs geometry]] [-spc n]
  [-label label] [-nofs] [-bat] [-fs 12|16] [-fatcopies n] [-rootdir n] [-force] [-v] [-examples]
  file: Image file to create (IMGMAKE.IMG if not set)
  -t: Type of image, one of:
      ";

const USAGE_TAIL: &str = "
      hd requires -size or -chs
  -size: Size of a custom hard disk image in MiB (3-2014).
  -chs: Disk geometry as c(1-1023),h(1-65),s(1-63).
  -nofs: Create a blank image without a filesystem.
  -force: Overwrite an existing image file.
  -bat: Write a .BAT file with the imgmount command for this image.
  -fs: FAT type (12 or 16).
  -spc: Sectors per cluster, a power of 2.
  -fatcopies: Number of FAT copies (1-4).
  -label: Volume label (at most 11 characters).
  -rootdir: Root directory entries (1-4096).
  -v: Verbose logging.
  -examples: Show some usage examples.
";

const EXAMPLES: &str = "Some usage examples:

  diskimg -t fd                      create a 1.44MB floppy image IMGMAKE.IMG
  diskimg -t fd_1440 -force          overwrite IMGMAKE.IMG with a floppy image
  diskimg dos.img -t fd_2880         create a 2.88MB floppy image named dos.img
  diskimg disk.img -t hd -size 50    create a 50MB hard disk image
  diskimg disk.img -t hd_520 -nofs   create a 520MB blank hard disk image
  diskimg disk.img -t hd -chs 65,2,17  create a hard disk image of that CHS
";

/// Command-line failure carrying the exit code of its option family.
#[derive(Debug)]
struct CliError {
    code: ErrorCode,
    message: String,
}

impl CliError {
    fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CliError {}

#[derive(Debug, Default)]
struct Options {
    filename: Option<PathBuf>,
    request: ImageRequest,
    type_given: bool,
    force: bool,
    bat: bool,
    verbose: bool,
}

enum Command {
    Usage,
    /// No `-t` given; usage is shown and the run fails.
    MissingType,
    Examples,
    Create(Options),
}

fn print_usage(out: &mut impl Write) -> io::Result<()> {
    let names: Vec<&str> = template_names().collect();
    write!(out, "{}{}{}", USAGE, names.join(" "), USAGE_TAIL)?;
    out.flush()
}

/// `code` when the output was written, a file error otherwise.
fn show(written: io::Result<()>, code: ExitCode) -> ExitCode {
    match written {
        Ok(()) => code,
        Err(_) => ExitCode::from(ErrorCode::FileError.as_u8()),
    }
}

fn number(value: Option<OsString>, option: &str, code: ErrorCode) -> Result<u32, CliError> {
    value
        .as_deref()
        .and_then(|v| v.to_str())
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| CliError::new(code, format!("Invalid {} option. Unrecognized value format.", option)))
}

fn parse_chs(value: Option<OsString>) -> Result<(u32, u32, u32), CliError> {
    let bad = || CliError::new(ErrorCode::InvalidChs, "Invalid -chs option. Unrecognized value format.");
    let value = value.and_then(|v| v.into_string().ok()).ok_or_else(bad)?;
    let mut parts = value.split(',').map(|p| p.trim().parse::<u32>());
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(c)), Some(Ok(h)), Some(Ok(s))) => Ok((c, h, s)),
        _ => Err(bad()),
    }
}

/// Arguments are taken as raw OS strings: filenames and labels need not be UTF-8.
fn parse_args(args: impl Iterator<Item = OsString>) -> Result<Command, CliError> {
    let mut opts = Options::default();
    let mut args = args;

    while let Some(arg) = args.next() {
        let flag = arg.to_str().map(str::to_ascii_lowercase).unwrap_or_default();
        match flag.as_str() {
            "-?" => return Ok(Command::Usage),
            "-examples" => return Ok(Command::Examples),
            "-t" => {
                let ty = args
                    .next()
                    .ok_or_else(|| CliError::new(ErrorCode::InvalidUsage, "Missing value for -t option."))?;
                opts.request.type_name = ty.to_string_lossy().into_owned();
                opts.type_given = true;
            }
            "-size" => {
                opts.request.size_mib = Some(number(args.next(), "-size", ErrorCode::InvalidSize)?);
            }
            "-chs" => opts.request.chs = Some(parse_chs(args.next())?),
            "-spc" => {
                opts.request.fs.sectors_per_cluster = Some(number(args.next(), "-spc", ErrorCode::InvalidSpc)?);
            }
            "-fs" => {
                opts.request.fs.fat_type = Some(number(args.next(), "-fs", ErrorCode::InvalidFatType)?);
            }
            "-fatcopies" => {
                opts.request.fs.fat_copies =
                    Some(number(args.next(), "-fatcopies", ErrorCode::InvalidFatCopies)?);
            }
            "-rootdir" => {
                opts.request.fs.root_entries =
                    Some(number(args.next(), "-rootdir", ErrorCode::InvalidRootDir)?);
            }
            "-label" => {
                let label = args
                    .next()
                    .ok_or_else(|| CliError::new(ErrorCode::InvalidUsage, "Missing value for -label option."))?;
                opts.request.fs.label = Some(label.into_encoded_bytes());
            }
            "-nofs" => opts.request.fs.blank = true,
            "-bat" => opts.bat = true,
            "-force" => opts.force = true,
            "-v" => opts.verbose = true,
            _ if opts.filename.is_none() => opts.filename = Some(PathBuf::from(arg)),
            _ => {
                return Err(CliError::new(
                    ErrorCode::InvalidUsage,
                    format!("Unexpected argument \"{}\".", arg.to_string_lossy()),
                ))
            }
        }
    }

    if !opts.type_given {
        return Ok(Command::MissingType);
    }
    Ok(Command::Create(opts))
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .init();
}

/// Write the DOS batch file that mounts `image_path` in the emulator.
fn write_mount_helper(image_path: &Path, command: &str) -> Result<PathBuf> {
    let bat = image_path.with_extension("BAT");
    let written = File::create(&bat).and_then(|mut f| write!(f, "{}\r\n", command));
    if let Err(e) = written {
        let _ = fs::remove_file(&bat);
        return Err(CliError::new(
            ErrorCode::FileError,
            format!("the file \"{}\" cannot be written: {}", bat.display(), e),
        )
        .into());
    }
    Ok(bat)
}

fn create(opts: Options) -> Result<()> {
    let filename = opts
        .filename
        .unwrap_or_else(|| PathBuf::from(DEFAULT_FILENAME));

    let plan = plan(&opts.request)?;

    if !opts.force && filename.exists() {
        return Err(CliError::new(
            ErrorCode::FileError,
            format!(
                "The file \"{}\" already exists. You can specify \"-force\" to overwrite.",
                filename.display()
            ),
        )
        .into());
    }

    let g = plan.image.geometry;
    println!(
        "Creating image file \"{}\" with {} cylinders, {} heads and {} sectors.",
        filename.display(),
        g.cylinders,
        g.heads,
        g.sectors
    );
    create_file(&filename, &plan.image)?;

    if opts.bat {
        let command = plan.image.mount_command(&filename.display().to_string());
        let bat = write_mount_helper(&filename, &command)?;
        tracing::info!("wrote mount helper {}", bat.display());
    }
    Ok(())
}

fn exit_code(err: &anyhow::Error) -> ErrorCode {
    if let Some(cli) = err.downcast_ref::<CliError>() {
        return cli.code;
    }
    if let Some(e) = err.downcast_ref::<diskimg::Error>() {
        return e.code();
    }
    ErrorCode::FileError
}

fn main() -> ExitCode {
    let command = match parse_args(env::args_os().skip(1)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(e.code.as_u8());
        }
    };

    let opts = match command {
        Command::Usage => return show(print_usage(&mut io::stdout().lock()), ExitCode::SUCCESS),
        Command::MissingType => {
            return show(
                print_usage(&mut io::stderr().lock()),
                ExitCode::from(ErrorCode::InvalidUsage.as_u8()),
            );
        }
        Command::Examples => {
            let mut out = io::stdout().lock();
            return show(out.write_all(EXAMPLES.as_bytes()).and_then(|_| out.flush()), ExitCode::SUCCESS);
        }
        Command::Create(opts) => opts,
    };

    init_logging(opts.verbose);

    match create(opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::from(exit_code(&e).as_u8())
        }
    }
}
