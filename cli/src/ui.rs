use comfy_table::{
    Cell, Color, ContentArrangement, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
};
use owo_colors::OwoColorize;

pub fn app_name() -> &'static str {
    "mev-bot"
}

pub fn build_banner() -> String {
    let version = env!("CARGO_PKG_VERSION");
    let indent = "      ";

    let logo = format!(
        "{indent} ███╗   ███╗███████╗██╗   ██╗      ██████╗  ██████╗ ████████╗\n\
         {indent} ████╗ ████║██╔════╝██║   ██║      ██╔══██╗██╔═══██╗╚══██╔══╝\n\
         {indent} ██╔████╔██║█████╗  ██║   ██║█████╗██████╔╝██║   ██║   ██║\n\
         {indent} ██║╚██╔╝██║██╔══╝  ╚██╗ ██╔╝╚════╝██╔══██╗██║   ██║   ██║\n\
         {indent} ██║ ╚═╝ ██║███████╗ ╚████╔╝       ██████╔╝╚██████╔╝   ██║\n\
         {indent} ╚═╝     ╚═╝╚══════╝  ╚═══╝        ╚═════╝  ╚═════╝    ╚═╝"
    )
    .bright_cyan()
    .bold()
    .to_string();

    let line = format!("{indent}{}", "━".repeat(62).dimmed());
    let name = "MEV-BOT".bright_white().bold().to_string();
    let sep = "•".dimmed().to_string();
    let desc = "Solana Backrun Engine".white().to_string();
    let ver = format!("v{version}").bright_yellow().to_string();

    format!(
        "\n{logo}\n\
         {line}\n\
         {indent}  {name} {sep} {desc} {sep} {ver}\n\
         {line}"
    )
}

pub fn print_venues() {
    let venues = [
        ("PumpSwap", "Constant-product bonding pair"),
        ("Raydium V4", "Constant product with order-book attachment"),
        ("Raydium CLMM", "Concentrated liquidity, tick arrays"),
        ("Meteora DLMM", "Discretized bins"),
    ];

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Venue")
                .fg(Color::White)
                .add_attribute(comfy_table::Attribute::Bold),
            Cell::new("Model")
                .fg(Color::White)
                .add_attribute(comfy_table::Attribute::Bold),
        ]);

    for (name, model) in venues {
        table.add_row(vec![
            Cell::new(name)
                .fg(Color::Magenta)
                .add_attribute(comfy_table::Attribute::Bold),
            Cell::new(model).fg(Color::White),
        ]);
    }

    println!("\n{}", "  Supported Venues".bright_white().bold());
    for line in table.to_string().lines() {
        println!("  {line}");
    }
}

pub fn print_version() {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_width(50);

    let version = env!("CARGO_PKG_VERSION");

    table.add_row(vec![
        Cell::new("MEV-BOT")
            .fg(Color::Cyan)
            .add_attribute(comfy_table::Attribute::Bold),
        Cell::new(format!("v{version}"))
            .fg(Color::Yellow)
            .add_attribute(comfy_table::Attribute::Bold),
    ]);

    table.add_row(vec![
        Cell::new("Build Arch").fg(Color::White),
        Cell::new(std::env::consts::ARCH).fg(Color::Cyan),
    ]);

    println!("\n  {}", "  System Information".bright_white().bold());
    for line in table.to_string().lines() {
        println!("  {line}");
    }
    println!();
}

pub fn print_config_error(path: &std::path::Path, error: &anyhow::Error) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_width(60);

    table.add_row(vec![
        Cell::new("⚠️  CONFIG ERROR")
            .fg(Color::Red)
            .add_attribute(comfy_table::Attribute::Bold),
    ]);

    let mut error_chain = String::new();
    for (i, cause) in error.chain().enumerate() {
        if i == 0 {
            error_chain.push_str(&format!("{cause}\n"));
        } else {
            error_chain.push_str(&format!("  └─ Caused by: {cause}\n"));
        }
    }

    let error_text = format!(
        "Failed to load configuration file.\n\n\
         Path: {}\n\
         Error: {error_chain}",
        path.display(),
    );

    table.add_row(vec![Cell::new(error_text).fg(Color::White)]);

    println!("\n  {}", "  Configuration Issue".bright_white().bold());
    for line in table.to_string().lines() {
        println!("  {line}");
    }
}
