//! Test profile validation and logging
//!
//! Loads a profile (the first argument, else configs/default.toml) and then
//! feeds a few broken profiles through the validator to show the errors:
//! - Unknown key names
//! - Two spellings of the same key
//! - Dodge binds missing from [binds]

use kbm2pad::mapping::config::Config;

const BROKEN: [(&str, &str); 3] = [
    (
        "unknown key name",
        r#"
        [binds]
        grave = { type = "toggle" }
        not_a_key = { type = "button", button = "a" }
        "#,
    ),
    (
        "two spellings of W",
        r#"
        [binds]
        grave = { type = "toggle" }
        w = { type = "button", button = "a" }
        0x11 = { type = "button", button = "b" }
        "#,
    ),
    (
        "dodge jump not bound",
        r#"
        [dodge]
        jump = "space"

        [binds]
        grave = { type = "toggle" }
        "#,
    ),
];

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "configs/default.toml".to_string());

    println!("Testing profile validation with {}...\n", path);

    match Config::load(&path) {
        Ok(config) => {
            println!("\n✅ Profile loaded successfully!");
            println!("   Binds: {}", config.binds.len());
            if let Some(toggle) = config.toggle_key() {
                println!("   Toggle key: {}", toggle);
            }
            println!("   Mouse drives the {:?} stick", config.mouse.stick);
            match config.dodge.jump {
                Some(jump) => println!("   Dodge on {} for {:?}", jump, config.dodge.lock()),
                None => println!("   Dodge disabled"),
            }
        }
        Err(e) => {
            eprintln!("\n❌ Profile validation failed: {}", e);
            std::process::exit(1);
        }
    }

    println!("\n---\n");

    for (name, content) in BROKEN {
        match Config::from_toml_str(content) {
            Ok(_) => {
                eprintln!("❌ UNEXPECTED: '{}' should have failed validation!", name);
                std::process::exit(1);
            }
            Err(e) => {
                println!("✅ Validation correctly caught {}:", name);
                println!("   {}\n", e);
            }
        }
    }
}
