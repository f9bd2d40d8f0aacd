use hashlab::{
    Error,
    workload::{self, DEFAULT_KEYS},
};
use hashtables::instrument::TrackingAllocator;
use log::{error, info};

#[global_allocator]
static ALLOC: TrackingAllocator = TrackingAllocator;

fn main() -> Result<(), Error> {
    env_logger::builder().init();

    let n = match std::env::args().nth(1) {
        Some(arg) => match arg.parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => return Err(Error::InvalidKeyCount(arg)),
        },
        None => DEFAULT_KEYS,
    };
    let keys = workload::keys(n);
    info!("running {} setups over {n} keys", workload::setups().len());

    for setup in workload::setups() {
        let run = workload::run(&setup, &keys).inspect_err(|e| error!("{}: {e}", setup.name))?;
        if run.hits != n || run.misses != n {
            error!(
                "{}: {} of {n} keys found, {} of {n} absent keys missed",
                run.name, run.hits, run.misses
            );
        }
    }

    Ok(())
}
