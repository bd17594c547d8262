//! grit CLI - git-compatible version control command line interface

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use chrono::DateTime;
use clap::{Parser, Subcommand};
use colored::Colorize;

use grit::ops::{
    add, checkout, commit, log, ls_tree, rm, status, tag_create, tag_list, CheckoutOptions,
    ChangeKind, RmOptions, Status,
};
use grit::{find, hash_object, read_object, write_object, Ignore, Index, Kind, Object, Repository};

#[derive(Parser)]
#[command(name = "grit")]
#[command(about = "git-compatible version control: loose objects, index and refs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// initialize an empty repository
    Init {
        /// where to create the repository
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// print the payload of a repository object
    CatFile {
        /// expected object type (blob, commit, tag, tree)
        #[arg(value_name = "type")]
        object_type: String,

        /// object to display
        object: String,
    },

    /// compute an object id and optionally store the object
    HashObject {
        /// object type to hash as
        #[arg(short = 't', default_value = "blob", value_name = "type")]
        object_type: String,

        /// write the object into the database
        #[arg(short = 'w')]
        write: bool,

        /// file to hash
        path: PathBuf,
    },

    /// show history starting from a commit
    Log {
        /// starting commit
        #[arg(default_value = "HEAD")]
        commit: String,
    },

    /// list staged files
    LsFiles {
        /// show entry details
        #[arg(short = 'v', long)]
        verbose: bool,
    },

    /// print a tree object
    LsTree {
        /// recurse into sub-trees
        #[arg(short = 'r')]
        recursive: bool,

        /// tree-ish to list
        tree: String,
    },

    /// list references with their ids
    ShowRef,

    /// resolve a name to an object id
    RevParse {
        /// peel to the expected type
        #[arg(long = "type", value_name = "type")]
        object_type: Option<String>,

        /// the name to resolve
        name: String,
    },

    /// add file contents to the index
    Add {
        /// files or directories to stage
        #[arg(required = true)]
        path: Vec<PathBuf>,
    },

    /// remove files from the working tree and the index
    Rm {
        /// allow recursive removal of directories
        #[arg(short = 'r')]
        recursive: bool,

        /// only remove from the index
        #[arg(long)]
        cached: bool,

        /// files to remove
        #[arg(required = true)]
        path: Vec<PathBuf>,
    },

    /// record changes to the repository
    Commit {
        /// commit message
        #[arg(short = 'm', value_name = "message", required = true)]
        message: String,
    },

    /// switch to a commit, or materialize it at a path
    Checkout {
        /// overwrite local changes
        #[arg(short = 'f', long)]
        force: bool,

        /// the commit to check out
        commit: String,

        /// directory to check out into (default: the worktree)
        path: Option<PathBuf>,
    },

    /// show the working tree status
    Status,

    /// check paths against ignore rules
    CheckIgnore {
        /// repo-relative paths to check
        #[arg(required = true)]
        path: Vec<String>,
    },

    /// list and create tags
    Tag {
        /// create an annotated tag object
        #[arg(short = 'a')]
        annotated: bool,

        /// list all tags
        #[arg(short = 'l', long = "list")]
        list: bool,

        /// tag name
        name: Option<String>,

        /// object the tag points to
        #[arg(default_value = "HEAD")]
        object: String,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("fatal: {}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run(cli: Cli) -> grit::Result<()> {
    match cli.command {
        Commands::Init { path } => {
            let repo = Repository::init(&path)?;
            println!("initialized empty repository in {}", repo.gitdir().display());
        }

        Commands::CatFile {
            object_type,
            object,
        } => {
            let repo = open_repo()?;
            let kind = Kind::from_str(&object_type)?;
            let oid = find(&repo, &object, Some(kind), true)?;
            let parsed = read_object(&repo, &oid)?;
            io::stdout()
                .write_all(&parsed.serialize())
                .map_err(|e| grit::Error::Io {
                    path: PathBuf::from("<stdout>"),
                    source: e,
                })?;
        }

        Commands::HashObject {
            object_type,
            write,
            path,
        } => {
            let kind = Kind::from_str(&object_type)?;
            let data = std::fs::read(&path).map_err(|e| grit::Error::Io {
                path: path.clone(),
                source: e,
            })?;
            let object = Object::parse(kind, &data)?;
            let oid = if write {
                write_object(&open_repo()?, &object)?
            } else {
                hash_object(&object)
            };
            println!("{}", oid);
        }

        Commands::Log { commit } => {
            let repo = open_repo()?;
            for entry in log(&repo, &commit)? {
                println!("{}", entry);
            }
        }

        Commands::LsFiles { verbose } => {
            let repo = open_repo()?;
            let index = Index::read(&repo)?;
            if verbose {
                println!(
                    "index file format v{}, has {} entries",
                    index.version(),
                    index.len()
                );
            }
            for entry in index.entries() {
                println!("{}", entry.name);
                if verbose {
                    print_entry_details(entry);
                }
            }
        }

        Commands::LsTree { recursive, tree } => {
            let repo = open_repo()?;
            for row in ls_tree(&repo, &tree, recursive)? {
                println!("{}", row);
            }
        }

        Commands::ShowRef => {
            let repo = open_repo()?;
            let tree = grit::refs::list(&repo, "refs")?;
            for (name, oid) in grit::refs::flatten(&tree, "refs") {
                println!("{} {}", oid, name);
            }
        }

        Commands::RevParse { object_type, name } => {
            let repo = open_repo()?;
            let kind = object_type.as_deref().map(Kind::from_str).transpose()?;
            println!("{}", find(&repo, &name, kind, true)?);
        }

        Commands::Add { path } => {
            let repo = open_repo()?;
            add(&repo, &path)?;
        }

        Commands::Rm {
            recursive,
            cached,
            path,
        } => {
            let repo = open_repo()?;
            rm(&repo, &path, RmOptions { cached, recursive })?;
        }

        Commands::Commit { message } => {
            let repo = open_repo()?;
            let oid = commit(&repo, &message)?;
            println!("{}", oid);
        }

        Commands::Checkout {
            force,
            commit,
            path,
        } => {
            let repo = open_repo()?;
            let outcome = checkout(&repo, &commit, path.as_deref(), CheckoutOptions { force })?;
            if let Some(summary) = outcome.detached {
                println!("note: switching to '{}'", commit);
                println!();
                println!("you are in 'detached HEAD' state");
                println!();
                println!("HEAD is now at {} {}", outcome.oid.short(), summary);
            }
        }

        Commands::Status => {
            let repo = open_repo()?;
            print_status(&status(&repo)?);
        }

        Commands::CheckIgnore { path } => {
            let repo = open_repo()?;
            let ignore = Ignore::read(&repo)?;
            for path in path {
                if ignore.check(&path)? {
                    println!("{}", path);
                }
            }
        }

        Commands::Tag {
            annotated,
            list,
            name,
            object,
        } => {
            let repo = open_repo()?;
            match (list, name) {
                (false, Some(name)) => {
                    tag_create(&repo, &name, &object, annotated, "")?;
                }
                _ => {
                    for tag in tag_list(&repo)? {
                        println!("{}", tag);
                    }
                }
            }
        }
    }

    Ok(())
}

/// locate the repository from the current directory
fn open_repo() -> grit::Result<Repository> {
    Repository::discover(Path::new("."))
}

fn print_entry_details(entry: &grit::IndexEntry) {
    let entry_type = match entry.mode_type {
        grit::index::MODE_TYPE_SYMLINK => "symlink",
        grit::index::MODE_TYPE_GITLINK => "git link",
        _ => "regular file",
    };
    println!("  {} with perms: {:o}", entry_type, entry.mode_perms);
    println!("  on blob: {}", entry.oid);
    println!(
        "  created: {}.{}, modified: {}.{}",
        format_seconds(entry.ctime.0),
        entry.ctime.1,
        format_seconds(entry.mtime.0),
        entry.mtime.1
    );
    println!("  device: {}, inode: {}", entry.dev, entry.ino);
    println!("  user: {}  group: {}", entry.uid, entry.gid);
    println!(
        "  flags: stage={} assume_valid={}",
        entry.stage, entry.assume_valid
    );
}

fn format_seconds(secs: u32) -> String {
    match DateTime::from_timestamp(i64::from(secs), 0) {
        Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => secs.to_string(),
    }
}

fn print_status(st: &Status) {
    match (&st.branch, &st.head) {
        (Some(branch), _) => println!("on branch {}", branch.cyan()),
        (None, Some(head)) => println!("HEAD detached at {}", head),
        (None, None) => println!("HEAD detached"),
    }
    println!();

    println!("changes to be committed:");
    for change in &st.staged {
        println!("\t{}", format_change(change.kind, &change.path));
    }
    println!();

    println!("changes not staged for commit:");
    for change in &st.unstaged {
        println!("\t{}", format_change(change.kind, &change.path));
    }
    println!();

    println!("untracked files:");
    for path in &st.untracked {
        println!("\t{}", path.red());
    }
}

fn format_change(kind: ChangeKind, path: &str) -> String {
    match kind {
        ChangeKind::Added => format!("{} {}", "added:   ".green(), path),
        ChangeKind::Modified => format!("{} {}", "modified:".yellow(), path),
        ChangeKind::Deleted => format!("{} {}", "deleted: ".red(), path),
    }
}
