use leadboard::board::BoardError;
use leadboard::cli::run;

fn main() {
    let _ = enable_ansi_support::enable_ansi_support();
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("LEADBOARD_LOG", "warn")).init();

    if let Err(e) = run() {
        match e.downcast_ref::<BoardError>() {
            // Permission failures are shown in place of the board
            Some(BoardError::PermissionDenied(message)) => {
                eprintln!("Error: {}", message);
                std::process::exit(1);
            }
            // Already reported through the notifier
            Some(BoardError::Rejected(_)) => std::process::exit(1),
            _ => {
                eprintln!("Internal error: {}", e);
                let mut source = e.source();
                if source.is_some() {
                    eprintln!("\nCaused by:");
                    let mut indent = 1;
                    while let Some(err) = source {
                        eprintln!("{:indent$}  {}", "", err);
                        source = err.source();
                        indent += 1;
                    }
                }
                std::process::exit(2);
            }
        }
    }
}
