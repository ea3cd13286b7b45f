//! Entry point for the binary.

use tbl::common::*;

fn main() {
    // Work and report error if any.
    if let Err(errs) = ::tbl::work() {
        print_err(&errs);
        ::std::process::exit(2)
    } else {
        ::std::process::exit(0)
    }
}
