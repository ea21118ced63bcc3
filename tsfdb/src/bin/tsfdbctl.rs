//
// Copyright (c) tsfdb contributors
// See License.txt for details
use tsfdb::cli;

/// tsfdbctl is an alias to the main function in cli::ctl, selected by the
/// binary's own name (see `cli::main`).
fn main() {
    cli::main()
}
