use std::process::ExitCode;

use firstfit::{ArenaConfig, FirstFitAllocator};

fn main() -> ExitCode {
    env_logger::init();

    let mut allocator = match FirstFitAllocator::new(ArenaConfig::default()) {
        Ok(allocator) => allocator,
        Err(err) => {
            eprintln!("Error {err}");
            return ExitCode::FAILURE;
        }
    };

    match allocator.allocate(5) {
        Ok(allocation) => println!("{:p}", allocation.as_ptr()),
        Err(err) => {
            eprintln!("Error {err}");
            return ExitCode::FAILURE;
        }
    }

    let location = match allocator.locate_free(500) {
        Ok(location) => location,
        Err(err) => {
            eprintln!("Error {err}");
            return ExitCode::FAILURE;
        }
    };
    println!("{:p}", allocator.arena().base());
    if let Some(addr) = allocator.arena().address_of(location) {
        println!("{addr:p}");
    }

    ExitCode::SUCCESS
}
