use std::process::Command;

fn get_revision() -> Option<String> {
    let out = Command::new("git")
        .args(&["rev-parse", "--verify", "HEAD"])
        .output()
        .ok()?;
    if out.status.success() {
        Some(String::from_utf8_lossy(&out.stdout).trim().to_string())
    } else {
        None
    }
}

fn main() {
    use std::fs::OpenOptions;
    use std::io::Write;
    let mut file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .create(true)
        .open("src/common/revision.rs")
        .expect("while opening revision file");
    let revision = match get_revision() {
        Some(rev) => format!("Some(\"{}\")", rev),
        None => "None".to_string(),
    };
    file.write_fmt(format_args!(
        "\
         //! Stores the current revision.\n\
         \n\
         /// Git revision the crate was built from, if any.\n\
         pub const REVISION: Option<&str> = {};\n\
         ",
        revision
    ))
    .expect("while writing revision file");
    file.flush().expect("while flushing revision file");
}
