use std::io::{self, Write};

use log::{debug, error};
use nix::errno::Errno;
use nix::unistd::{fork, getpid, ForkResult, Pid};

/// What a single call to the duplication primitive returned, as seen from
/// one of the (possibly two) resulting processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicationResult {
    /// No new process was created.
    Failed(Errno),
    /// This is the newly created process.
    Child,
    /// This is the original process. The pid is the new child's.
    Parent(Pid),
}

impl From<nix::Result<ForkResult>> for DuplicationResult {
    fn from(result: nix::Result<ForkResult>) -> Self {
        match result {
            Ok(ForkResult::Child) => DuplicationResult::Child,
            Ok(ForkResult::Parent { child }) => DuplicationResult::Parent(child),
            Err(errno) => DuplicationResult::Failed(errno),
        }
    }
}

/// The capability to duplicate the calling process.
pub trait Duplicate {
    fn duplicate(&mut self) -> DuplicationResult;
}

/// Duplicates the process with `fork(2)`.
///
/// The caller must be single-threaded when this runs, which is why
/// construction is unsafe.
#[derive(Debug)]
pub struct SystemFork {
    _private: (),
}

impl SystemFork {
    /// # Safety
    ///
    /// No other threads may exist when [`Duplicate::duplicate`] is called.
    /// See [`nix::unistd::fork`].
    pub unsafe fn new() -> SystemFork {
        SystemFork { _private: () }
    }
}

impl Duplicate for SystemFork {
    fn duplicate(&mut self) -> DuplicationResult {
        // SAFETY: upheld by the caller of `SystemFork::new`
        DuplicationResult::from(unsafe { fork() })
    }
}

/// The terminal state of a probe: the one line this process prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    ForkError,
    Father,
    Son,
}

impl Report {
    pub fn line(&self) -> &'static str {
        match self {
            Report::ForkError => "Fork Error!",
            Report::Father => "Father",
            Report::Son => "Son",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Report::ForkError => 1,
            Report::Father | Report::Son => 0,
        }
    }
}

impl From<&DuplicationResult> for Report {
    fn from(result: &DuplicationResult) -> Self {
        match result {
            DuplicationResult::Failed(_) => Report::ForkError,
            DuplicationResult::Parent(_) => Report::Father,
            DuplicationResult::Child => Report::Son,
        }
    }
}

/// A probe that has not duplicated yet. Running it consumes it, so the
/// primitive is called at most once per probe.
#[derive(Debug)]
pub struct Probe<D> {
    duplicator: D,
}

impl<D: Duplicate> Probe<D> {
    pub fn new(duplicator: D) -> Probe<D> {
        Probe { duplicator }
    }

    /// Duplicates once, then writes this process's line to `out` and
    /// flushes it.
    pub fn run(mut self, out: &mut impl Write) -> io::Result<Report> {
        debug!("[{}]: duplicating", getpid());

        let result = self.duplicator.duplicate();
        match result {
            DuplicationResult::Failed(errno) => error!("failed to fork: {}", errno),
            DuplicationResult::Parent(child) => debug!("[{}]: parent of {}", getpid(), child),
            DuplicationResult::Child => debug!("[{}]: child", getpid()),
        }

        let report = Report::from(&result);
        writeln!(out, "{}", report.line())?;
        out.flush()?;

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        result: DuplicationResult,
        calls: usize,
    }

    impl Duplicate for &mut Fixed {
        fn duplicate(&mut self) -> DuplicationResult {
            self.calls += 1;
            self.result
        }
    }

    fn probe(result: DuplicationResult) -> io::Result<(Report, String, usize)> {
        let mut fixed = Fixed { result, calls: 0 };
        let mut out = Vec::new();
        let report = Probe::new(&mut fixed).run(&mut out)?;
        let text = String::from_utf8(out).expect("probe wrote invalid utf8");
        Ok((report, text, fixed.calls))
    }

    #[test]
    fn failure_prints_fork_error() -> io::Result<()> {
        let (report, text, calls) = probe(DuplicationResult::Failed(Errno::EAGAIN))?;
        assert_eq!(report, Report::ForkError);
        assert_eq!(text, "Fork Error!\n");
        assert_eq!(report.exit_code(), 1);
        assert_eq!(calls, 1);
        Ok(())
    }

    #[test]
    fn parent_prints_father() -> io::Result<()> {
        let (report, text, calls) = probe(DuplicationResult::Parent(Pid::from_raw(4242)))?;
        assert_eq!(report, Report::Father);
        assert_eq!(text, "Father\n");
        assert_eq!(report.exit_code(), 0);
        assert_eq!(calls, 1);
        Ok(())
    }

    #[test]
    fn child_prints_son() -> io::Result<()> {
        let (report, text, calls) = probe(DuplicationResult::Child)?;
        assert_eq!(report, Report::Son);
        assert_eq!(text, "Son\n");
        assert_eq!(report.exit_code(), 0);
        assert_eq!(calls, 1);
        Ok(())
    }

    #[test]
    fn exactly_one_line_per_branch() -> io::Result<()> {
        for result in [
            DuplicationResult::Failed(Errno::ENOMEM),
            DuplicationResult::Parent(Pid::from_raw(1)),
            DuplicationResult::Child,
        ] {
            let (_, text, _) = probe(result)?;
            assert_eq!(text.lines().count(), 1, "{:?} printed {:?}", result, text);
        }
        Ok(())
    }

    #[test]
    fn from_fork_result() {
        assert_eq!(
            DuplicationResult::from(Ok(ForkResult::Child)),
            DuplicationResult::Child
        );
        assert_eq!(
            DuplicationResult::from(Ok(ForkResult::Parent {
                child: Pid::from_raw(7)
            })),
            DuplicationResult::Parent(Pid::from_raw(7))
        );
        assert_eq!(
            DuplicationResult::from(Err(Errno::EAGAIN)),
            DuplicationResult::Failed(Errno::EAGAIN)
        );
    }

    #[test]
    fn write_errors_propagate() {
        struct Broken;

        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::from(io::ErrorKind::BrokenPipe))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut fixed = Fixed {
            result: DuplicationResult::Child,
            calls: 0,
        };
        let err = Probe::new(&mut fixed).run(&mut Broken).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
