use std::io::Write;

/// Command output. Goes to stdout.
pub fn line(message: impl AsRef<str>) {
    let mut stdout = std::io::stdout().lock();
    let _ = writeln!(stdout, "{}", message.as_ref());
}

pub fn lines<I, S>(messages: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut stdout = std::io::stdout().lock();
    for message in messages {
        let _ = writeln!(stdout, "{}", message.as_ref());
    }
}

/// Diagnostics. Go to stderr, next to the logs.
pub fn error(message: impl AsRef<str>) {
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "{}", message.as_ref());
}
