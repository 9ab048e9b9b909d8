//! The shell verbs.
//!
//! Each verb takes the words of a command line, the verb itself included, and returns 0 on
//! success or a negative status on failure. Diagnostics go to the same output as results.

use std::{fmt::Display, io::Write};

use anyhow::Result;
use log::{debug, warn};

use crate::{error::FsError, storage::BlockDevice, tinyfs::TinyFs};

/// Status returned by a verb that failed.
pub const FAILURE: i32 = -1;

pub struct Shell<D: BlockDevice, W: Write> {
    fs: TinyFs<D>,
    out: W,
}

impl<D: BlockDevice, W: Write> Shell<D, W> {
    pub fn new(fs: TinyFs<D>, out: W) -> Self {
        Shell { fs, out }
    }

    /// Runs the verb named by `argv[0]`.
    pub fn execute(&mut self, argv: &[&str]) -> i32 {
        debug!("executing {argv:?}");

        match argv.first().copied() {
            None => 0,
            Some("ls") => self.ls(argv),
            Some("mkdir") => self.mkdir(argv),
            Some("touch") => self.touch(argv),
            Some("cp") => self.cp(argv),
            Some(_) => {
                self.diagnose("can not parse command.");
                FAILURE
            }
        }
    }

    /// `ls [path]`
    pub fn ls(&mut self, argv: &[&str]) -> i32 {
        let result = match argv {
            [_] => self.fs.list(None),
            [_, path] => self.fs.list(Some(*path)),
            _ => Err(FsError::Usage("usage: ls [path]").into()),
        };

        let result = result.and_then(|listing| {
            for line in listing {
                writeln!(self.out, "{line}")?;
            }
            Ok(())
        });

        self.report(result)
    }

    /// `mkdir <path>`
    pub fn mkdir(&mut self, argv: &[&str]) -> i32 {
        let result = single_path(argv, "usage: mkdir <path>")
            .and_then(|path| self.fs.make_directory(path));

        self.report(result.map(drop))
    }

    /// `touch <path>`
    pub fn touch(&mut self, argv: &[&str]) -> i32 {
        let result =
            single_path(argv, "usage: touch <path>").and_then(|path| self.fs.make_file(path));

        self.report(result.map(drop))
    }

    /// `cp <dest> <src>`
    pub fn cp(&mut self, argv: &[&str]) -> i32 {
        let result = match argv {
            [_, destination, source] => self.fs.copy(destination, source),
            _ => Err(FsError::Usage("usage: cp <dest> <src>").into()),
        };

        self.report(result.map(drop))
    }

    /// Takes the shell apart, e.g. to close the filesystem.
    pub fn into_inner(self) -> (TinyFs<D>, W) {
        (self.fs, self.out)
    }

    fn report(&mut self, result: Result<()>) -> i32 {
        match result {
            Ok(()) => 0,
            Err(err) => {
                self.diagnose(format_args!("{err:#}"));
                FAILURE
            }
        }
    }

    fn diagnose(&mut self, message: impl Display) {
        if let Err(err) = writeln!(self.out, "{message}") {
            warn!("unable to write diagnostic: {err}");
        }
    }
}

fn single_path<'a>(argv: &[&'a str], usage: &'static str) -> Result<&'a str> {
    match argv {
        [_, path] => Ok(*path),
        [_] => Err(FsError::Usage("too few arguments").into()),
        _ => Err(FsError::Usage(usage).into()),
    }
}
