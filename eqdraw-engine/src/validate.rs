use std::collections::HashSet;

use thiserror::Error;
use tracing::debug;

use crate::parameters::ComponentParameters;
use crate::spec::{Component, ConnectionEnd, DrawingSpec, Position};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpecValidationError {
    #[error("missing required field {field}")]
    MissingField { field: String },
    #[error("unsupported drawing units {units:?} (only millimeters are supported)")]
    UnsupportedUnits { units: String },
    #[error("duplicate component id {id:?}")]
    DuplicateComponentId { id: String },
    #[error("duplicate connection id {id:?}")]
    DuplicateConnectionId { id: String },
    #[error("component {id:?} has non-positive size {width} x {height}")]
    NonPositiveSize { id: String, width: f64, height: f64 },
    #[error("{field} is not a finite number")]
    NonFiniteValue { field: String },
    #[error("connection {connection:?}: {end} endpoint references unknown component {component:?}")]
    UnknownEndpoint {
        connection: String,
        end: ConnectionEnd,
        component: String,
    },
    #[error("connection {connection:?} connects component {component:?} to itself")]
    SelfConnection {
        connection: String,
        component: String,
    },
    #[error("connection {connection:?} has invalid diameter {diameter}")]
    InvalidDiameter { connection: String, diameter: f64 },
    #[error("component {component:?} parameter {key:?}: {reason}")]
    InvalidParameter {
        component: String,
        key: String,
        reason: String,
    },
    #[error("invalid layout: {reason}")]
    InvalidLayout { reason: String },
    #[error("{field} contains control characters")]
    ControlCharacters { field: String },
}

/// 通过校验的规格，附带各组件的类型化参数（与 `components` 顺序一致）。
#[derive(Debug)]
pub struct ValidatedSpec<'a> {
    spec: &'a DrawingSpec,
    parameters: Vec<ComponentParameters>,
}

impl<'a> ValidatedSpec<'a> {
    #[inline]
    pub fn spec(&self) -> &'a DrawingSpec {
        self.spec
    }

    pub fn components(&self) -> impl Iterator<Item = (&'a Component, &ComponentParameters)> {
        self.spec.components.iter().zip(self.parameters.iter())
    }

    pub fn parameters_of(&self, id: &str) -> Option<&ComponentParameters> {
        self.spec
            .components
            .iter()
            .position(|component| component.id == id)
            .map(|index| &self.parameters[index])
    }
}

/// 校验规格；任何违规都在绘制之前报告。
pub fn validate(spec: &DrawingSpec) -> Result<ValidatedSpec<'_>, SpecValidationError> {
    require_text("project.name", &spec.project.name)?;
    single_line("project.name", &spec.project.name)?;
    single_line("project.systemType", &spec.project.system_type)?;
    if !units_are_millimeters(&spec.project.units) {
        return Err(SpecValidationError::UnsupportedUnits {
            units: spec.project.units.clone(),
        });
    }
    validate_layout(spec)?;

    let mut ids = HashSet::new();
    let mut parameters = Vec::with_capacity(spec.components.len());
    for (index, component) in spec.components.iter().enumerate() {
        let field = |name: &str| format!("components[{index}].{name}");
        require_text(&field("id"), &component.id)?;
        single_line(&field("id"), &component.id)?;
        single_line(&field("name"), &component.name)?;
        if !ids.insert(component.id.as_str()) {
            return Err(SpecValidationError::DuplicateComponentId {
                id: component.id.clone(),
            });
        }
        finite_position(&field("position"), component.position)?;
        let size = component.size;
        if !size.width.is_finite() || !size.height.is_finite() {
            return Err(SpecValidationError::NonFiniteValue {
                field: field("size"),
            });
        }
        if size.width <= 0.0 || size.height <= 0.0 {
            return Err(SpecValidationError::NonPositiveSize {
                id: component.id.clone(),
                width: size.width,
                height: size.height,
            });
        }
        for (callout_index, callout) in component.additional_callouts.iter().enumerate() {
            let field = |name: &str| field(&format!("additionalCallouts[{callout_index}].{name}"));
            require_text(&field("text"), &callout.text)?;
            if let Some(label) = &callout.label {
                single_line(&field("label"), label)?;
            }
            finite_position(&field("targetOffset"), callout.target_offset)?;
            finite_position(&field("textOffset"), callout.text_offset)?;
        }

        let typed = ComponentParameters::from_raw(&component.kind, &component.parameters)
            .map_err(|issue| SpecValidationError::InvalidParameter {
                component: component.id.clone(),
                key: issue.key,
                reason: issue.reason,
            })?;
        parameters.push(typed);
    }

    let mut connection_ids = HashSet::new();
    for (index, connection) in spec.connections.iter().enumerate() {
        let field = |name: &str| format!("connections[{index}].{name}");
        require_text(&field("id"), &connection.id)?;
        single_line(&field("id"), &connection.id)?;
        if !connection_ids.insert(connection.id.as_str()) {
            return Err(SpecValidationError::DuplicateConnectionId {
                id: connection.id.clone(),
            });
        }
        for (end, target) in [
            (ConnectionEnd::From, &connection.from),
            (ConnectionEnd::To, &connection.to),
        ] {
            if !ids.contains(target.as_str()) {
                return Err(SpecValidationError::UnknownEndpoint {
                    connection: connection.id.clone(),
                    end,
                    component: target.clone(),
                });
            }
        }
        if connection.from == connection.to {
            return Err(SpecValidationError::SelfConnection {
                connection: connection.id.clone(),
                component: connection.from.clone(),
            });
        }
        if let Some(diameter) = connection.diameter {
            if !diameter.is_finite() || diameter <= 0.0 {
                return Err(SpecValidationError::InvalidDiameter {
                    connection: connection.id.clone(),
                    diameter,
                });
            }
        }
        if let Some(material) = &connection.material {
            single_line(&field("material"), material)?;
        }
    }

    for (index, annotation) in spec.annotations.iter().enumerate() {
        let field = |name: &str| format!("annotations[{index}].{name}");
        require_text(&field("text"), &annotation.text)?;
        finite_position(&field("position"), annotation.position)?;
    }

    debug!(
        components = spec.components.len(),
        connections = spec.connections.len(),
        "规格校验通过"
    );
    Ok(ValidatedSpec { spec, parameters })
}

fn units_are_millimeters(units: &str) -> bool {
    matches!(
        units.trim().to_ascii_lowercase().as_str(),
        "mm" | "millimeter" | "millimeters" | "millimetre" | "millimetres"
    )
}

fn validate_layout(spec: &DrawingSpec) -> Result<(), SpecValidationError> {
    let layout = spec.layout;
    for (name, value) in [
        ("width", layout.width),
        ("height", layout.height),
        ("gridSpacing", layout.grid_spacing),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(SpecValidationError::InvalidLayout {
                reason: format!("{name} must be a positive number (got {value})"),
            });
        }
    }
    Ok(())
}

fn require_text(field: &str, value: &str) -> Result<(), SpecValidationError> {
    if value.trim().is_empty() {
        return Err(SpecValidationError::MissingField {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn single_line(field: &str, value: &str) -> Result<(), SpecValidationError> {
    if value.chars().any(char::is_control) {
        return Err(SpecValidationError::ControlCharacters {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn finite_position(field: &str, position: Position) -> Result<(), SpecValidationError> {
    if position.is_finite() {
        Ok(())
    } else {
        Err(SpecValidationError::NonFiniteValue {
            field: field.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{
        Annotation, Connection, ConnectionKind, EquipmentKind, Layout, ProjectInfo, Size,
    };

    fn spec() -> DrawingSpec {
        DrawingSpec {
            project: ProjectInfo::new("Validation"),
            components: vec![
                Component::new(
                    "P-1",
                    EquipmentKind::Pump,
                    Position::new(100.0, 100.0),
                    Size::new(200.0, 150.0),
                ),
                Component::new(
                    "T-1",
                    EquipmentKind::Tank,
                    Position::new(500.0, 100.0),
                    Size::new(150.0, 200.0),
                ),
            ],
            connections: vec![Connection::new("C1", "P-1", "T-1", ConnectionKind::Pipe)],
            layout: Layout::default(),
            annotations: Vec::new(),
        }
    }

    #[test]
    fn valid_spec_passes_and_keeps_parameter_order() {
        let mut spec = spec();
        spec.components[1]
            .parameters
            .insert("capacity".into(), 50.0.into());
        let validated = validate(&spec).expect("valid spec");
        let collected: Vec<_> = validated.components().map(|(c, p)| (c.id.as_str(), p.is_empty())).collect();
        assert_eq!(collected, [("P-1", true), ("T-1", false)]);
        assert!(validated.parameters_of("T-1").is_some());
        assert!(validated.parameters_of("X").is_none());
    }

    #[test]
    fn duplicate_component_ids_are_rejected() {
        let mut spec = spec();
        spec.components[1].id = "P-1".into();
        assert_eq!(
            validate(&spec).unwrap_err(),
            SpecValidationError::DuplicateComponentId { id: "P-1".into() }
        );
    }

    #[test]
    fn unknown_endpoint_names_the_connection_end() {
        let mut spec = spec();
        spec.connections[0].to = "T-9".into();
        assert_eq!(
            validate(&spec).unwrap_err(),
            SpecValidationError::UnknownEndpoint {
                connection: "C1".into(),
                end: ConnectionEnd::To,
                component: "T-9".into(),
            }
        );
    }

    #[test]
    fn self_connections_are_rejected() {
        let mut spec = spec();
        spec.connections[0].to = "P-1".into();
        assert!(matches!(
            validate(&spec),
            Err(SpecValidationError::SelfConnection { .. })
        ));
    }

    #[test]
    fn non_positive_and_non_finite_sizes_are_rejected() {
        let mut spec = spec();
        spec.components[0].size = Size::new(0.0, 10.0);
        assert!(matches!(
            validate(&spec),
            Err(SpecValidationError::NonPositiveSize { .. })
        ));

        spec.components[0].size = Size::new(f64::NAN, 10.0);
        assert!(matches!(
            validate(&spec),
            Err(SpecValidationError::NonFiniteValue { .. })
        ));

        spec.components[0].size = Size::new(10.0, 10.0);
        spec.components[0].position = Position::new(f64::INFINITY, 0.0);
        assert_eq!(
            validate(&spec).unwrap_err(),
            SpecValidationError::NonFiniteValue {
                field: "components[0].position".into()
            }
        );
    }

    #[test]
    fn only_millimeters_are_supported() {
        let mut spec = spec();
        spec.project.units = "Millimeters".into();
        assert!(validate(&spec).is_ok());
        spec.project.units = "in".into();
        assert!(matches!(
            validate(&spec),
            Err(SpecValidationError::UnsupportedUnits { .. })
        ));
    }

    #[test]
    fn missing_text_fields_are_reported() {
        let mut spec = spec();
        spec.project.name = "  ".into();
        assert_eq!(
            validate(&spec).unwrap_err(),
            SpecValidationError::MissingField {
                field: "project.name".into()
            }
        );

        let mut spec = self::spec();
        spec.annotations.push(Annotation {
            text: String::new(),
            position: Position::new(0.0, 0.0),
        });
        assert!(matches!(
            validate(&spec),
            Err(SpecValidationError::MissingField { .. })
        ));
    }

    #[test]
    fn control_characters_in_identifiers_are_rejected() {
        let mut spec = spec();
        spec.components[0].name = "Pump\nA".into();
        assert_eq!(
            validate(&spec).unwrap_err(),
            SpecValidationError::ControlCharacters {
                field: "components[0].name".into()
            }
        );
    }

    #[test]
    fn bad_parameters_and_diameters_are_rejected() {
        let mut spec = spec();
        spec.components[0]
            .parameters
            .insert("efficiency".into(), 140.0.into());
        assert!(matches!(
            validate(&spec),
            Err(SpecValidationError::InvalidParameter { ref key, .. }) if key == "efficiency"
        ));

        let mut spec = self::spec();
        spec.connections[0].diameter = Some(-50.0);
        assert!(matches!(
            validate(&spec),
            Err(SpecValidationError::InvalidDiameter { .. })
        ));
    }

    #[test]
    fn layout_must_be_positive() {
        let mut spec = spec();
        spec.layout.grid_spacing = 0.0;
        assert!(matches!(
            validate(&spec),
            Err(SpecValidationError::InvalidLayout { .. })
        ));
    }
}
