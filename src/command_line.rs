use anyhow::{anyhow, Result};
use aws_sdk_dynamodb::types::AttributeValue;
use persistent_attributes::dynamodb::{Attributes, TableBackend};
use persistent_attributes::AttributesStore;
use std::io::{self, Write};
use tracing::info;

/// Runs the command-line interface for one user's attributes.
///
/// This function enters a loop that prompts the user for commands and executes them.
/// The supported commands are:
/// - set: Set an attribute in memory
/// - remove: Remove an attribute from memory
/// - show: Print the in-memory attributes
/// - save: Write the in-memory attributes, replacing the stored item
/// - get: Read and print the stored attributes
/// - info: Print table information
/// - exit: Exit the program
pub async fn run<B: TableBackend>(store: &mut AttributesStore<B>) -> Result<()> {
    loop {
        let command = prompt("Enter command (set/remove/show/save/get/info/exit)", None)?;
        match command.as_str() {
            "set" => set_attribute(store)?,
            "remove" => remove_attribute(store)?,
            "show" => print_attributes("In-memory attributes", store.attributes()),
            "save" => {
                store.save_attributes().await?;
                info!("Attributes saved for '{}'", store.user_id());
            }
            "get" => match store.get_attributes().await? {
                Some(attributes) => print_attributes("Stored attributes", &attributes),
                None => println!("No attributes stored for '{}'", store.user_id()),
            },
            "info" => print_info(store),
            "exit" => break,
            _ => println!("Unknown command. Please try again."),
        }
    }
    Ok(())
}

/// Prompts for an attribute name, type and value and sets it in memory.
fn set_attribute<B: TableBackend>(store: &mut AttributesStore<B>) -> Result<()> {
    let name = prompt("Enter attribute name", Some("favorite_color"))?;
    if name.is_empty() {
        return Err(anyhow!("Attribute name must not be empty"));
    }
    let value_type = prompt("Enter value type (S, N or BOOL)", Some("S"))?;
    let value = prompt("Enter value", Some("blue"))?;

    let attribute_value = match value_type.to_uppercase().as_str() {
        "S" => AttributeValue::S(value),
        "N" => {
            value.parse::<f64>()?;
            AttributeValue::N(value)
        }
        "BOOL" => AttributeValue::Bool(value.parse()?),
        _ => return Err(anyhow!("Unsupported value type")),
    };

    store.set_attribute(name, attribute_value);
    Ok(())
}

fn remove_attribute<B: TableBackend>(store: &mut AttributesStore<B>) -> Result<()> {
    let name = prompt("Enter attribute name", None)?;
    match store.remove_attribute(&name) {
        Some(_) => println!("Removed '{}'", name),
        None => println!("'{}' is not set", name),
    }
    Ok(())
}

fn print_info<B>(store: &AttributesStore<B>) {
    let table = store.table();
    println!("\n--- Table Information ---");
    println!("Table Name: {}", table.name());
    println!("Partition Key: {}", table.partition_key());
    println!("Status at connect: {}", table.status());
    println!("User: {}", store.user_id());
    println!("Unsaved attributes: {}", store.attributes().len());
    println!("-------------------------\n");
}

fn print_attributes(title: &str, attributes: &Attributes) {
    println!("\n--- {} ---", title);
    let mut entries: Vec<_> = attributes.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
        .iter()
        .for_each(|(name, value)| println!("{}: {:?}", name, value));
    println!("{}", "-".repeat(title.len() + 8));
}

/// Prompts the user for input and returns the entered string.
fn prompt(message: &str, example: Option<&str>) -> Result<String> {
    let full_message = if let Some(ex) = example {
        format!("{} (e.g., {}): ", message, ex)
    } else {
        format!("{}: ", message)
    };
    print!("{}", full_message);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
