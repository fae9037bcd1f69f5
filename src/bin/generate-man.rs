// Writes the leadboard man page to the directory given as the first argument
// (default: ./man)

use clap::CommandFactory;
use leadboard::cli::Cli;
use std::path::PathBuf;

fn main() -> std::io::Result<()> {
    let dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));
    std::fs::create_dir_all(&dir)?;

    let cmd = Cli::command();
    let mut buf = Vec::new();
    clap_mangen::Man::new(cmd.clone()).render(&mut buf)?;
    let path = dir.join("leadboard.1");
    std::fs::write(&path, &buf)?;
    eprintln!("Generated {} ({} bytes)", path.display(), buf.len());

    for sub in cmd.get_subcommands() {
        let name = format!("leadboard-{}", sub.get_name());
        let mut buf = Vec::new();
        clap_mangen::Man::new(sub.clone()).title(name.clone()).render(&mut buf)?;
        let path = dir.join(format!("{}.1", name));
        std::fs::write(&path, &buf)?;
        eprintln!("Generated {} ({} bytes)", path.display(), buf.len());
    }
    Ok(())
}
