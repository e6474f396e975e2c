//! unwatermark CLI - PDF watermark removal tool

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::{warn, LevelFilter};

use unwatermark::{
    collect_pdf_files, BatchJob, EditOptions, ImageSize, JsonFormat, PdfEditor, SaveOptions,
};

#[derive(Parser, Debug)]
#[command(name = "unwatermark")]
#[command(version)]
#[command(about = "Remove watermark links, images and text from PDF files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Remove links, images or text matching the given criteria
    Remove {
        /// Input PDF file or directory
        #[arg(short, long, value_name = "PATH")]
        input: PathBuf,

        /// Output directory (default: <name>_new.pdf beside each input)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Remove links pointing to these URLs
        #[arg(long, num_args = 1.., value_name = "URL")]
        links: Vec<String>,

        /// Remove images of these sizes, as WIDTH,HEIGHT
        #[arg(long, num_args = 1.., value_name = "W,H")]
        image_size: Vec<ImageSize>,

        /// Remove images with this XObject name
        #[arg(long, num_args = 1.., value_name = "NAME")]
        image_name: Vec<String>,

        /// Remove text matching this regular expression
        #[arg(long, value_name = "REGEX")]
        pattern: Option<String>,

        /// Remove the whole page when anything matches
        #[arg(long)]
        remove_page: bool,

        /// Do not paint white over removed links
        #[arg(long)]
        no_link_fill: bool,

        /// Do not compress streams on save
        #[arg(long)]
        no_compress: bool,

        /// Password for encrypted documents
        #[arg(long, env = "UNWATERMARK_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Export images as PNG files
    Image {
        /// Input PDF file
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR", env = "UNWATERMARK_IMAGE_DIR", default_value = "images")]
        output: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List links and images per page
    Info {
        /// Input PDF file
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Commands::Remove { verbose, .. } | Commands::Image { verbose, .. } => *verbose,
            Commands::Info { .. } => false,
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.command.verbose());

    let result = match cli.command {
        Commands::Remove {
            input,
            output,
            links,
            image_size,
            image_name,
            pattern,
            remove_page,
            no_link_fill,
            no_compress,
            password,
            verbose: _,
        } => {
            let mut edit_options = EditOptions::new();
            if no_link_fill {
                edit_options = edit_options.with_link_fill(None);
            }
            if let Some(password) = password {
                edit_options = edit_options.with_password(password);
            }
            let job = BatchJob {
                links,
                image_sizes: image_size,
                image_names: image_name,
                pattern,
                remove_page,
                edit_options,
                save_options: SaveOptions::new().with_deflate(!no_compress),
            };
            cmd_remove(&input, output.as_deref(), &job)
        }
        Commands::Image { input, output, .. } => cmd_image(&input, &output),
        Commands::Info { input, json } => cmd_info(&input, json),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn cmd_remove(input: &Path, output: Option<&Path>, job: &BatchJob) -> Result<(), Box<dyn std::error::Error>> {
    if job.is_empty() {
        warn!("No removal criteria given, files are only cleaned up and recompressed");
    }

    let files = collect_pdf_files(input)?;
    if files.is_empty() {
        println!("{} {}", "No PDF files found in".yellow(), input.display());
        return Ok(());
    }

    let pb = if files.len() > 1 {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let results = job.run(&files, output, |path| {
        if let Some(pb) = &pb {
            pb.set_message(path.file_name().unwrap_or_default().to_string_lossy().to_string());
            pb.inc(1);
        }
    })?;

    if let Some(pb) = pb {
        pb.finish_with_message("Done!");
    }

    println!("\n{}", "Removed:".green().bold());
    for (path, report) in &results {
        println!(
            "  {} {} ({} links, {} images, {} text, {} pages)",
            "├─".dimmed(),
            path.display(),
            report.links_removed,
            report.images_removed,
            report.text_removed,
            report.pages_removed
        );
    }
    Ok(())
}

fn cmd_image(input: &Path, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let editor = PdfEditor::open(input)?;
    let report = editor.export_images(output)?;

    for path in &report.exported {
        println!("{} {}", "Extracted".green(), path.display());
    }
    for (name, reason) in &report.skipped {
        println!("{} {}: {}", "Skipped".yellow(), name, reason);
    }
    println!(
        "\n{} {} images extracted, {} duplicates",
        "Done!".green().bold(),
        report.exported.len(),
        report.duplicates
    );
    Ok(())
}

fn cmd_info(input: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let editor = PdfEditor::open(input)?;
    let inventory = editor.inventory()?;

    if json {
        println!("{}", inventory.to_json(JsonFormat::Pretty)?);
        return Ok(());
    }

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), inventory.version);
    println!("{}: {}", "Pages".bold(), inventory.pages);

    println!();
    println!("{}", "Links".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for link in &inventory.links {
        println!(
            "  page {:>4}  {}  {}",
            link.page,
            link.uri.as_deref().unwrap_or("-"),
            link.rect.to_string().dimmed()
        );
    }

    println!();
    println!("{}", "Images".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for image in &inventory.images {
        println!(
            "  page {:>4}  {:<8} {}x{}  {} placement(s)",
            image.page,
            image.name,
            image.width,
            image.height,
            image.placements.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_remove_command() {
        let cli = Cli::try_parse_from([
            "unwatermark",
            "remove",
            "-i",
            "book.pdf",
            "--links",
            "https://a.example",
            "https://b.example",
            "--image-size",
            "480,201",
            "--remove-page",
        ])
        .unwrap();

        match cli.command {
            Commands::Remove {
                links,
                image_size,
                remove_page,
                output,
                ..
            } => {
                assert_eq!(links.len(), 2);
                assert_eq!(image_size, vec![ImageSize::new(480, 201)]);
                assert!(remove_page);
                assert!(output.is_none());
            }
            _ => panic!("expected remove"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_image_size() {
        let result = Cli::try_parse_from(["unwatermark", "remove", "-i", "a.pdf", "--image-size", "480"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_image_default_output() {
        std::env::remove_var("UNWATERMARK_IMAGE_DIR");
        let cli = Cli::try_parse_from(["unwatermark", "image", "-i", "a.pdf"]).unwrap();
        match cli.command {
            Commands::Image { output, .. } => assert_eq!(output, PathBuf::from("images")),
            _ => panic!("expected image"),
        }
    }

    #[test]
    fn test_parse_requires_input() {
        assert!(Cli::try_parse_from(["unwatermark", "info"]).is_err());
    }

    #[test]
    fn test_parse_several_image_sizes() {
        let cli = Cli::try_parse_from([
            "unwatermark",
            "remove",
            "-i",
            "a.pdf",
            "--image-size",
            "480,201",
            "100,50",
            "--pattern",
            "foo",
        ])
        .unwrap();

        match cli.command {
            Commands::Remove { image_size, pattern, .. } => {
                assert_eq!(image_size, vec![ImageSize::new(480, 201), ImageSize::new(100, 50)]);
                assert_eq!(pattern.as_deref(), Some("foo"));
            }
            _ => panic!("expected remove"),
        }
    }

    #[test]
    fn test_cmd_remove_without_criteria() {
        let dir = tempfile::tempdir().unwrap();
        assert!(cmd_remove(dir.path(), None, &BatchJob::new()).is_ok());
    }
}
