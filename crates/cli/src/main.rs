use clap::Parser;

mod args;
mod convert;
mod info;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = args::Args::parse();
    match args.command {
        args::Commands::Convert(args) => convert::convert_command(args),
        args::Commands::Info(args) => info::info_command(args),
    }
}
