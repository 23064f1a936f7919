//! Banner and pairing code display.

/// Print the application banner.
pub fn print_banner() {
    println!("\n\x1b[1;36m╔══════════════════════════════════════╗\x1b[0m");
    println!("\x1b[1;36m║\x1b[0m             \x1b[1mDeck Remote\x1b[0m              \x1b[1;36m║\x1b[0m");
    println!("\x1b[1;36m║\x1b[0m   Control your slides from a phone   \x1b[1;36m║\x1b[0m");
    println!("\x1b[1;36m╚══════════════════════════════════════╝\x1b[0m\n");
}

/// Print the pairing code spaced out so it reads well from across a room.
pub fn print_pairing_code(code: &str) {
    println!("\n\x1b[1;33mEnter this code in the remote app to pair:\x1b[0m\n");
    println!("    \x1b[1;37m{}\x1b[0m\n", spaced(code));
}

fn spaced(code: &str) -> String {
    code.chars()
        .map(String::from)
        .collect::<Vec<_>>()
        .join(" ")
}
