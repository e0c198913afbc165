use openstrand_wizard::cli::{parse_args, Command, USAGE};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let parsed = match parse_args(args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    match parsed.command {
        Command::Help => println!("{}", USAGE),

        // Deterministic walkthrough against the in-memory catalog.
        // Writes `wizard_smoke_transcript.log` under `Wizard_Log/` and exits 0/1.
        Command::Smoke => openstrand_wizard::run_smoke(parsed.config.as_deref()),

        Command::Submit(submit) => openstrand_wizard::run_submit(parsed.config.as_deref(), submit),
    }
}
