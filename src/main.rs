use car_reader::{Catalog, CatalogOptions, NamedRendition, RenditionContent};
use std::env;

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let idx = args.iter().position(|arg| arg == flag)?;
    match args.get(idx + 1) {
        Some(value) => Some(value),
        None => {
            eprintln!("ERROR: {} flag requires an argument.", flag);
            std::process::exit(1);
        }
    }
}

fn describe(rendition: &NamedRendition) {
    println!("  Rendition: {}", rendition.rendition_name);
    println!("  Kind: {}", rendition.kind);
    println!("  Key: {}", rendition.key);
    println!("  Exact match: {}", rendition.exact);
    println!("  Scale: {}", rendition.scale());
    if let Some(state) = rendition.theme_state_name() {
        println!("  State: {}", state);
    }
    match &rendition.content {
        RenditionContent::Image(image) => {
            println!("  Pixels: {}x{}", image.width(), image.height());
            println!("  Template: {}", image.attributes.is_template);
            println!("  Slices: {}", image.attributes.slices.len());
        }
        RenditionContent::Vector(vector) => {
            println!("  Vector format: {}", vector.format);
            println!(
                "  Size: {}x{} pt",
                vector.attributes.size.width, vector.attributes.size.height
            );
        }
        RenditionContent::Color(color) => {
            println!("  Color space: {:?}", color.color_space);
            println!("  Components: {:?}", color.components);
            if let Some(name) = &color.system_color_name {
                println!("  System color: {}", name);
            }
        }
        RenditionContent::Document(document) => {
            println!("  PDF version: {}", document.version);
            println!("  Pages: {}", document.page_count());
        }
        RenditionContent::ThemeStore(store) => {
            println!("  Nested store: {} renditions", store.theme_store().index().len());
        }
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!(
            "Usage: {} <path-to-car-file> [--encoding <label>] [--name <name>] [--scale <factor>]",
            args[0]
        );
        std::process::exit(1);
    }

    let car_path = &args[1];
    let mut options = CatalogOptions::default();
    if let Some(label) = flag_value(&args, "--encoding") {
        options = options.with_encoding(label);
    }
    let name = flag_value(&args, "--name");
    let scale = match flag_value(&args, "--scale") {
        Some(value) => match value.parse::<f64>() {
            Ok(scale) => scale,
            Err(_) => {
                eprintln!("ERROR: Invalid scale '{}'. Expected a number such as 2 or 3.", value);
                std::process::exit(1);
            }
        },
        None => 1.0,
    };

    println!("Reading asset catalog: {}", car_path);
    println!("{}", "=".repeat(60));

    let catalog = match Catalog::open_with(car_path, options) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("\nERROR: Failed to open asset catalog");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    let header = catalog.header();
    println!("\nCatalog Information:");
    println!("  Tag: {}", header.tag);
    println!("  Core version: {}", header.core_version);
    println!("  Storage version: {}", header.storage_version);
    println!("  Main version: {}", header.main_version);
    println!("  Version string: {}", header.version_string);
    println!("  UUID: {}", header.uuid_hex());

    println!("\nStatistics:");
    println!("  Renditions: {}", catalog.len());
    println!("  Names: {}", catalog.names().len());

    match name {
        Some(name) => {
            println!("\nLookup '{}' @{}x:", name, scale);
            match catalog.lookup(name, scale) {
                Ok(Some(rendition)) => describe(&rendition),
                Ok(None) => println!("  Not found"),
                Err(e) => {
                    eprintln!("  ERROR: {}", e);
                    std::process::exit(1);
                }
            }
        }
        None => {
            println!("\nNames (first 10):");
            for (i, name) in catalog.names().take(10).enumerate() {
                println!("  {}. {}", i + 1, name);
            }
            let total = catalog.names().len();
            if total > 10 {
                println!("  ... and {} more", total - 10);
            }
        }
    }

    catalog.close();
}
