use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser;
use glob::{MatchOptions, Pattern};
use ro2::{Table, Vdk, VdkWriter};

mod cli;
use crate::cli::{Check, Cmds, Create, Extract, Info, List, Show};

fn main() -> ro2::Result<()> {
    pretty_env_logger::init();
    Cmds::parse().exec()
}

trait Cmd {
    fn exec(&self) -> ro2::Result<()>;
}

impl Cmd for Cmds {
    fn exec(&self) -> ro2::Result<()> {
        match self {
            Cmds::Info(cmd) => cmd.exec(),
            Cmds::List(cmd) => cmd.exec(),
            Cmds::Extract(cmd) => cmd.exec(),
            Cmds::Create(cmd) => cmd.exec(),
            Cmds::Show(cmd) => cmd.exec(),
            Cmds::Check(cmd) => cmd.exec(),
        }
    }
}

impl Cmd for Info {
    fn exec(&self) -> ro2::Result<()> {
        let vdk = Vdk::open(&self.file)?;
        println!("version: {}", vdk.version());
        println!("files:   {}", vdk.file_count());
        println!("folders: {}", vdk.folder_count());
        println!("entries: {}", vdk.entries().len());
        Ok(())
    }
}

impl Cmd for List {
    fn exec(&self) -> ro2::Result<()> {
        let vdk = Vdk::open(&self.file)?;
        for entry in vdk.files() {
            if self.attributes {
                let c = if entry.compressed_size != entry.size { "c" } else { " " };
                println!("{} {:>10} {}", c, entry.size, entry.path);
            } else {
                println!("{}", entry.path);
            }
        }
        Ok(())
    }
}

struct FileMatcher {
    patterns: Vec<Pattern>,
}

impl FileMatcher {
    fn matches(&self, path: &str) -> bool {
        let match_opt = MatchOptions {
            case_sensitive: false,
            require_literal_leading_dot: false,
            require_literal_separator: false,
        };
        self.patterns.is_empty()
            || self.patterns.iter().any(|p| {
                p.matches_with(path, match_opt) || path.starts_with(p.as_str())
            })
    }
}

impl Cmd for Extract {
    fn exec(&self) -> ro2::Result<()> {
        let matcher = FileMatcher {
            patterns: self.paths.clone(),
        };
        let vdk = Vdk::open(&self.file)?;
        for entry in vdk.files() {
            if !matcher.matches(&entry.path) {
                continue;
            }
            println!("{}", entry.path);
            let data = vdk.extract(entry)?;
            let target = host_path(&self.output, &entry.path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            File::create(&target)?.write_all(&data)?;
        }
        Ok(())
    }
}

/// Translate a `/`-separated archive path into a host path below `root`.
fn host_path(root: &Path, archive_path: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for part in archive_path
        .split('/')
        .filter(|p| !p.is_empty() && *p != "." && *p != "..")
    {
        path.push(part);
    }
    path
}

impl Cmd for Create {
    fn exec(&self) -> ro2::Result<()> {
        let output = match self.output.as_ref() {
            Some(path) => path.clone(),
            None => self.dir.with_extension("vdk"),
        };
        let mut writer = VdkWriter::new();
        writer.add_dir(&self.dir, |path| println!("{}", path))?;
        let count = writer.write(&output, self.compress)?;
        println!("{}: {} files", output.display(), count);
        Ok(())
    }
}

impl Cmd for Show {
    fn exec(&self) -> ro2::Result<()> {
        let table = Table::open(&self.file)?;
        println!("{}", table.headers.join("\t"));
        let types: Vec<String> = table.types.iter().map(|ty| ty.to_string()).collect();
        println!("{}", types.join("\t"));
        for row in &table.rows {
            println!("{}", row.join("\t"));
        }
        Ok(())
    }
}

impl Cmd for Check {
    fn exec(&self) -> ro2::Result<()> {
        Table::verify(&fs::read(&self.file)?)?;
        println!("{}: ok", self.file.display());
        Ok(())
    }
}
