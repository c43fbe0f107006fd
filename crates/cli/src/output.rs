//! Console output: results on stdout, failures on stderr

use console::style;

pub fn print_success(message: &str) {
    println!("{}", style(message).green());
}

pub fn print_lines(lines: &[String]) {
    for line in lines {
        print_success(line);
    }
}

pub fn print_error(message: &str) {
    eprintln!("{}", style(message).red());
}
