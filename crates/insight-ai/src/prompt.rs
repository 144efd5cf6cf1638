//! Prompt construction for predictive analysis and chat.

use serde::Serialize;
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use insight_types::{Device, Reading};

/// Normal operating ranges quoted to the model.
pub const NORMAL_RANGES: &str = "Normal operating ranges are: Temperature < 70°C, Pressure < 160 PSI, Vibration < 3.0 G.";

/// Build the predictive-analysis prompt for a device's latest reading.
pub fn analysis_prompt(device: &Device) -> String {
    let Reading {
        temperature,
        pressure,
        vibration,
        ..
    } = device.current;

    format!(
        "You are a factory maintenance expert AI. Analyze the following real-time data for a piece of factory equipment.

Equipment Name: {name}
Communication Protocol: {protocol}

Current Sensor Readings:
- Temperature: {temperature:.1}°C
- Pressure: {pressure:.0} PSI
- Vibration: {vibration:.2} G

{NORMAL_RANGES}

Based on this data, provide a predictive maintenance analysis. Identify the risk level, summarize the potential issue, and suggest specific, actionable recommendations.
Return your analysis ONLY as a valid JSON object with the following schema:
{{ \"riskLevel\": \"Low\" | \"Medium\" | \"High\", \"prediction\": string, \"recommendations\": string[] }}",
        name = device.name,
        protocol = device.protocol,
    )
}

/// Response schema for providers that support structured output.
pub fn analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "riskLevel": { "type": "STRING" },
            "prediction": { "type": "STRING" },
            "recommendations": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["riskLevel", "prediction", "recommendations"]
    })
}

#[derive(Serialize)]
struct DeviceContext<'a> {
    id: &'a str,
    name: &'a str,
    protocol: &'a str,
    history: Vec<Reading>,
}

/// Build the chat system instruction embedding every device's history.
pub fn system_instruction(devices: &[Device], now: OffsetDateTime) -> String {
    let context: Vec<DeviceContext<'_>> = devices
        .iter()
        .map(|d| DeviceContext {
            id: &d.id,
            name: &d.name,
            protocol: &d.protocol,
            history: d.history.to_vec(),
        })
        .collect();
    let data = serde_json::to_string(&context).unwrap_or_else(|_| "[]".to_string());
    let now = now.format(&Rfc3339).unwrap_or_else(|_| now.to_string());

    format!(
        "You are an expert AI assistant for factory maintenance and industrial operations. \
         You are speaking with a factory floor engineer. Provide concise and helpful information. \
         You have access to the following real-time and historical device data in JSON format. \
         Use this data to answer user questions about device performance, trends, and specific past events. \
         The 'time' property in the history is an RFC 3339 UTC timestamp. \
         Current time is {now}. Device Data: {data}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use insight_types::DeviceSpec;

    fn pump() -> Device {
        Device::new(
            DeviceSpec::new("pmp-003", "Coolant Pump Gamma", "Modbus RTU"),
            Reading::clamped(OffsetDateTime::UNIX_EPOCH, 78.04, 180.4, 3.456),
        )
    }

    #[test]
    fn test_analysis_prompt_formatting() {
        let prompt = analysis_prompt(&pump());
        assert!(prompt.contains("Equipment Name: Coolant Pump Gamma"));
        assert!(prompt.contains("Communication Protocol: Modbus RTU"));
        assert!(prompt.contains("- Temperature: 78.0°C"));
        assert!(prompt.contains("- Pressure: 180 PSI"));
        assert!(prompt.contains("- Vibration: 3.46 G"));
        assert!(prompt.contains("Temperature < 70°C, Pressure < 160 PSI, Vibration < 3.0 G"));
        assert!(prompt.contains(r#"{ "riskLevel": "Low" | "Medium" | "High""#));
    }

    #[test]
    fn test_schema_requires_all_fields() {
        let schema = analysis_schema();
        assert_eq!(schema["required"].as_array().unwrap().len(), 3);
        assert_eq!(schema["properties"]["recommendations"]["type"], "ARRAY");
    }

    #[test]
    fn test_system_instruction_embeds_devices() {
        let text = system_instruction(&[pump()], OffsetDateTime::UNIX_EPOCH);
        assert!(text.starts_with("You are an expert AI assistant for factory maintenance"));
        assert!(text.contains("Current time is 1970-01-01T00:00:00Z."));

        let data = text.split("Device Data: ").nth(1).unwrap();
        let parsed: Value = serde_json::from_str(data).unwrap();
        assert_eq!(parsed[0]["id"], "pmp-003");
        assert_eq!(parsed[0]["protocol"], "Modbus RTU");
        assert_eq!(parsed[0]["history"].as_array().unwrap().len(), 1);
        assert_eq!(parsed[0]["history"][0]["time"], "1970-01-01T00:00:00Z");
    }
}
