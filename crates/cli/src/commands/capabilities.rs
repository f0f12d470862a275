//! `conclave capabilities` — List the configured capabilities.

use std::path::Path;
use conclave_core::capability::CapabilityDescriptor;

pub fn run(config: Option<&Path>) -> anyhow::Result<()> {
    let config = super::load_config(config)?;
    let descriptors = config.capability_descriptors();

    println!("🧩 Capabilities ({})", descriptors.len());
    println!("==================");
    for descriptor in &descriptors {
        print!("{}", describe(descriptor, descriptor.id.as_str() == config.router.default_capability));
    }
    Ok(())
}

fn describe(descriptor: &CapabilityDescriptor, is_default: bool) -> String {
    let keywords = if descriptor.keywords.is_empty() {
        "(none)".to_string()
    } else {
        descriptor.keywords.join(", ")
    };
    format!(
        "\n  {}{}\n    Label:       {}\n    Persona:     {}\n    Collection:  {}\n    Keywords:    {}\n",
        descriptor.id,
        if is_default { "  (default)" } else { "" },
        descriptor.label,
        descriptor.persona.as_str(),
        descriptor.collection,
        keywords,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_core::capability::Persona;

    #[test]
    fn describe_marks_default_and_empty_keywords() {
        let general = CapabilityDescriptor::new("general", "General Assistant", Persona::General);
        let text = describe(&general, true);
        assert!(text.contains("general  (default)"));
        assert!(text.contains("Keywords:    (none)"));
    }
}
