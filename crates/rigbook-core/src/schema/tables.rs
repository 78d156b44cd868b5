//! Static field tables, one per leaf kind.

use super::{ComponentKind, FieldDef, FieldType, Kind, KindSchema, Slot, SubComponentKind};
use crate::Decimal;

const fn int(min: i64, max: i64) -> FieldType {
    FieldType::Int { min, max }
}

/// Whole-number decimal bounds.
const fn dec(min: i64, max: i64) -> FieldType {
    FieldType::Decimal {
        min: Decimal::from_int(min),
        max: Decimal::from_int(max),
    }
}

/// Decimal bounds given in thousandths.
const fn dec_milli(min: i64, max: i64) -> FieldType {
    FieldType::Decimal {
        min: Decimal::from_thousandths(min),
        max: Decimal::from_thousandths(max),
    }
}

const fn text(min_len: usize, max_len: usize) -> FieldType {
    FieldType::Text { min_len, max_len }
}

const fn req(name: &'static str, ty: FieldType) -> FieldDef {
    FieldDef::required(name, ty)
}

const fn opt(name: &'static str, ty: FieldType) -> FieldDef {
    FieldDef::optional(name, ty)
}

// =============================================================================
// BASE FIELDS
// =============================================================================

pub(super) const COMPONENT_BASE: &[FieldDef] = &[
    FieldDef::system("Id", int(1, i64::MAX), Slot::Id),
    req("Name", text(1, 200)).text_indexed(),
    req("Manufacturer", text(1, 100)).text_indexed(),
    opt("ReleaseDate", FieldType::Date),
    FieldDef::system("Type", FieldType::Enum(COMPONENT_TAGS), Slot::Kind),
    FieldDef::system("CreatedAt", FieldType::Timestamp, Slot::Stored).privileged(),
    FieldDef::system("LastEdited", FieldType::Timestamp, Slot::Stored).privileged(),
    opt("Note", text(0, 1000)).privileged(),
];

pub(super) const SUB_COMPONENT_BASE: &[FieldDef] = &[
    FieldDef::system("Id", int(1, i64::MAX), Slot::Id),
    req("Name", text(1, 200)).text_indexed(),
    FieldDef::system("Type", FieldType::Enum(SUB_COMPONENT_TAGS), Slot::Kind),
];

const COMPONENT_TAGS: &[&str] = &[
    "CPU",
    "GPU",
    "Memory",
    "Motherboard",
    "PSU",
    "Case",
    "CaseFan",
    "Cooler",
    "Storage",
    "Monitor",
];

const SUB_COMPONENT_TAGS: &[&str] = &[
    "PCIeSlot",
    "M2Slot",
    "OnboardEthernet",
    "IntegratedGraphics",
    "Port",
    "CoolerSocket",
];

// =============================================================================
// ENUMERATIONS
// =============================================================================

const MEMORY_TYPES: &[&str] = &["DDR3", "DDR4", "DDR5", "LPDDR5"];
const VIDEO_MEMORY_TYPES: &[&str] = &["GDDR5", "GDDR6", "GDDR6X", "GDDR7", "HBM2", "HBM3"];
const GPU_INTERFACES: &[&str] = &["PCIe 3.0 x16", "PCIe 4.0 x16", "PCIe 4.0 x8", "PCIe 5.0 x16"];
const MEMORY_FORM_FACTORS: &[&str] = &["DIMM", "SO-DIMM"];
const BOARD_FORM_FACTORS: &[&str] = &["E-ATX", "ATX", "Micro-ATX", "Mini-ITX"];
const CASE_FORM_FACTORS: &[&str] = &["Full Tower", "Mid Tower", "Mini Tower", "Small Form Factor"];
const PSU_FORM_FACTORS: &[&str] = &["ATX", "SFX", "SFX-L", "TFX"];
const EFFICIENCY_RATINGS: &[&str] = &[
    "80+",
    "80+ Bronze",
    "80+ Silver",
    "80+ Gold",
    "80+ Platinum",
    "80+ Titanium",
];
const MODULARITY: &[&str] = &["Full", "Semi", "None"];
const SIDE_PANELS: &[&str] = &["Solid", "Acrylic", "Tempered Glass", "Mesh"];
const COOLER_TYPES: &[&str] = &["Air", "Liquid", "Passive"];
const STORAGE_TYPES: &[&str] = &["SSD", "HDD", "Hybrid"];
const STORAGE_FORM_FACTORS: &[&str] = &["2.5\"", "3.5\"", "M.2-2230", "M.2-2242", "M.2-2280"];
const STORAGE_INTERFACES: &[&str] = &["SATA", "NVMe PCIe 3.0", "NVMe PCIe 4.0", "NVMe PCIe 5.0"];
const PANEL_TYPES: &[&str] = &["IPS", "VA", "TN", "OLED"];
const FAN_LIGHTING: &[&str] = &["None", "Single Color", "RGB", "ARGB"];
const M2_KEYS: &[&str] = &["A", "B", "E", "M", "B+M"];
const M2_INTERFACES: &[&str] = &["SATA", "PCIe", "SATA/PCIe"];
const PORT_TYPES: &[&str] = &[
    "USB-A",
    "USB-C",
    "HDMI",
    "DisplayPort",
    "RJ45",
    "Audio",
    "PS/2",
];

// =============================================================================
// COMPONENT KINDS
// =============================================================================

const CPU_FIELDS: &[FieldDef] = &[
    req("CoreTotal", int(1, 512)),
    req("ThreadsAmount", int(1, 256)),
    // Declared as 0..=512 although performance cores are never absent.
    opt("PerformanceAmount", int(0, 512)),
    opt("EfficiencyAmount", int(0, 512)),
    req("BaseClock", dec_milli(100, 10_000)),
    opt("BoostClock", dec_milli(100, 10_000)),
    req("ThermalDesignPower", dec(1, 600)),
    req("Socket", text(1, 50)).text_indexed(),
    opt("Series", text(1, 100)).text_indexed(),
    opt("L2Cache", int(0, 1024)),
    opt("L3Cache", int(0, 1024)),
    opt("LithographyNm", int(1, 250)),
    opt("IntegratedGraphics", FieldType::Bool),
    opt("UnlockedMultiplier", FieldType::Bool),
    opt("MaxMemory", int(1, 16_384)),
];

const GPU_FIELDS: &[FieldDef] = &[
    req("Chipset", text(1, 100)).text_indexed(),
    req("VideoMemoryAmount", int(256, 262_144)),
    opt("MemoryType", FieldType::Enum(VIDEO_MEMORY_TYPES)),
    req("MemoryBusWidth", int(32, 4096)),
    opt("CoreClock", dec(100, 5000)),
    opt("BoostClock", dec(100, 5000)),
    req("Length", dec(10, 600)),
    opt("Slots", dec(1, 5)),
    opt("ThermalDesignPower", dec(1, 1000)),
    opt("Interface", FieldType::Enum(GPU_INTERFACES)),
    opt("PowerConnectors", text(1, 100)),
    opt("RayTracing", FieldType::Bool),
];

const MEMORY_FIELDS: &[FieldDef] = &[
    req("Speed", dec(100, 20_000)),
    req("ModuleQuantity", int(1, 16)),
    req("ModuleCapacity", int(1, 512)),
    req("MemoryType", FieldType::Enum(MEMORY_TYPES)),
    opt("CasLatency", int(1, 100)),
    opt("Voltage", dec_milli(500, 3000)),
    opt("FormFactor", FieldType::Enum(MEMORY_FORM_FACTORS)),
    opt("Ecc", FieldType::Bool),
    opt("HeatSpreader", FieldType::Bool),
];

const MOTHERBOARD_FIELDS: &[FieldDef] = &[
    req("Socket", text(1, 50)).text_indexed(),
    req("Chipset", text(1, 50)).text_indexed(),
    req("FormFactor", FieldType::Enum(BOARD_FORM_FACTORS)),
    req("MemorySlots", int(1, 16)),
    opt("MaxMemory", int(1, 16_384)),
    req("MemoryType", FieldType::Enum(MEMORY_TYPES)),
    opt("SataPorts", int(0, 16)),
    opt("WirelessNetworking", FieldType::Bool),
    opt("UsbHeaders", int(0, 16)),
];

const PSU_FIELDS: &[FieldDef] = &[
    req("Wattage", int(100, 3000)),
    opt("EfficiencyRating", FieldType::Enum(EFFICIENCY_RATINGS)),
    opt("Modularity", FieldType::Enum(MODULARITY)),
    req("FormFactor", FieldType::Enum(PSU_FORM_FACTORS)),
    opt("Length", dec(50, 300)),
    opt("FanSize", int(0, 200)),
];

const CASE_FIELDS: &[FieldDef] = &[
    req("FormFactor", FieldType::Enum(CASE_FORM_FACTORS)),
    req("MaxVideoCardLength", dec(10, 600)),
    req("MaxCPUCoolerHeight", dec(10, 300)),
    opt("MaxPSULength", dec(50, 400)),
    opt("DriveBays", int(0, 20)),
    opt("ExpansionSlots", int(0, 12)),
    opt("SidePanel", FieldType::Enum(SIDE_PANELS)),
    opt("IncludedFans", int(0, 12)),
];

const CASE_FAN_FIELDS: &[FieldDef] = &[
    req("Size", int(40, 250)),
    opt("MinRpm", int(0, 10_000)),
    opt("MaxRpm", int(0, 10_000)),
    opt("Airflow", dec(0, 300)),
    opt("NoiseLevel", dec(0, 100)),
    opt("Pwm", FieldType::Bool),
    opt("Lighting", FieldType::Enum(FAN_LIGHTING)),
    req("Quantity", int(1, 10)),
];

const COOLER_FIELDS: &[FieldDef] = &[
    req("CoolerType", FieldType::Enum(COOLER_TYPES)),
    opt("Height", dec(10, 300)),
    opt("RadiatorSize", int(0, 480)),
    opt("FanRpm", int(0, 10_000)),
    opt("NoiseLevel", dec(0, 100)),
    opt("ThermalDesignPower", dec(1, 600)),
    opt("Fanless", FieldType::Bool),
];

const STORAGE_FIELDS: &[FieldDef] = &[
    req("Capacity", int(1, 131_072)),
    req("StorageType", FieldType::Enum(STORAGE_TYPES)),
    req("FormFactor", FieldType::Enum(STORAGE_FORM_FACTORS)),
    req("Interface", FieldType::Enum(STORAGE_INTERFACES)),
    opt("ReadSpeed", int(1, 20_000)),
    opt("WriteSpeed", int(1, 20_000)),
    opt("CacheSize", int(0, 16_384)),
    opt("Rpm", int(0, 15_000)),
];

const MONITOR_FIELDS: &[FieldDef] = &[
    req("ScreenSize", dec(5, 100)),
    req("HorizontalResolution", int(160, 32_000)),
    req("VerticalResolution", int(120, 32_000)),
    req("RefreshRate", int(24, 1000)),
    opt("PanelType", FieldType::Enum(PANEL_TYPES)),
    opt("ResponseTime", dec_milli(10, 100_000)),
    opt("AspectRatio", text(3, 10)),
    opt("Curved", FieldType::Bool),
    opt("HdrSupport", FieldType::Bool),
    opt("Brightness", int(50, 10_000)),
];

// =============================================================================
// SUB-COMPONENT KINDS
// =============================================================================

const PCIE_SLOT_FIELDS: &[FieldDef] = &[
    req("Generation", int(1, 7)),
    req("Lanes", int(1, 16)),
    opt("Reinforced", FieldType::Bool),
];

const M2_SLOT_FIELDS: &[FieldDef] = &[
    req("KeyType", FieldType::Enum(M2_KEYS)),
    req("Interface", FieldType::Enum(M2_INTERFACES)),
    opt("SupportedSizes", text(1, 100)),
    opt("Generation", int(1, 7)),
];

const ONBOARD_ETHERNET_FIELDS: &[FieldDef] = &[
    req("Speed", dec_milli(10, 100_000)),
    opt("Controller", text(1, 100)).text_indexed(),
];

const INTEGRATED_GRAPHICS_FIELDS: &[FieldDef] = &[
    req("Model", text(1, 100)).text_indexed(),
    opt("BaseClock", int(100, 5000)),
    opt("BoostClock", int(100, 5000)),
];

const PORT_FIELDS: &[FieldDef] = &[
    req("PortType", FieldType::Enum(PORT_TYPES)),
    opt("Version", text(1, 20)),
];

const COOLER_SOCKET_FIELDS: &[FieldDef] = &[req("Socket", text(1, 50)).text_indexed()];

// =============================================================================
// SCHEMAS
// =============================================================================

macro_rules! schemas {
    ($($name:ident => $kind:expr, $base:expr, $own:expr;)*) => {
        $(
            static $name: KindSchema = KindSchema {
                kind: $kind,
                base: $base,
                own: $own,
            };
        )*
    };
}

schemas! {
    CPU => Kind::Component(ComponentKind::Cpu), COMPONENT_BASE, CPU_FIELDS;
    GPU => Kind::Component(ComponentKind::Gpu), COMPONENT_BASE, GPU_FIELDS;
    MEMORY => Kind::Component(ComponentKind::Memory), COMPONENT_BASE, MEMORY_FIELDS;
    MOTHERBOARD => Kind::Component(ComponentKind::Motherboard), COMPONENT_BASE, MOTHERBOARD_FIELDS;
    PSU => Kind::Component(ComponentKind::Psu), COMPONENT_BASE, PSU_FIELDS;
    CASE => Kind::Component(ComponentKind::Case), COMPONENT_BASE, CASE_FIELDS;
    CASE_FAN => Kind::Component(ComponentKind::CaseFan), COMPONENT_BASE, CASE_FAN_FIELDS;
    COOLER => Kind::Component(ComponentKind::Cooler), COMPONENT_BASE, COOLER_FIELDS;
    STORAGE => Kind::Component(ComponentKind::Storage), COMPONENT_BASE, STORAGE_FIELDS;
    MONITOR => Kind::Component(ComponentKind::Monitor), COMPONENT_BASE, MONITOR_FIELDS;
    PCIE_SLOT => Kind::SubComponent(SubComponentKind::PcieSlot), SUB_COMPONENT_BASE, PCIE_SLOT_FIELDS;
    M2_SLOT => Kind::SubComponent(SubComponentKind::M2Slot), SUB_COMPONENT_BASE, M2_SLOT_FIELDS;
    ONBOARD_ETHERNET => Kind::SubComponent(SubComponentKind::OnboardEthernet), SUB_COMPONENT_BASE, ONBOARD_ETHERNET_FIELDS;
    INTEGRATED_GRAPHICS => Kind::SubComponent(SubComponentKind::IntegratedGraphics), SUB_COMPONENT_BASE, INTEGRATED_GRAPHICS_FIELDS;
    PORT => Kind::SubComponent(SubComponentKind::Port), SUB_COMPONENT_BASE, PORT_FIELDS;
    COOLER_SOCKET => Kind::SubComponent(SubComponentKind::CoolerSocket), SUB_COMPONENT_BASE, COOLER_SOCKET_FIELDS;
}

pub(super) fn schema_for(kind: Kind) -> &'static KindSchema {
    match kind {
        Kind::Component(k) => match k {
            ComponentKind::Cpu => &CPU,
            ComponentKind::Gpu => &GPU,
            ComponentKind::Memory => &MEMORY,
            ComponentKind::Motherboard => &MOTHERBOARD,
            ComponentKind::Psu => &PSU,
            ComponentKind::Case => &CASE,
            ComponentKind::CaseFan => &CASE_FAN,
            ComponentKind::Cooler => &COOLER,
            ComponentKind::Storage => &STORAGE,
            ComponentKind::Monitor => &MONITOR,
        },
        Kind::SubComponent(k) => match k {
            SubComponentKind::PcieSlot => &PCIE_SLOT,
            SubComponentKind::M2Slot => &M2_SLOT,
            SubComponentKind::OnboardEthernet => &ONBOARD_ETHERNET,
            SubComponentKind::IntegratedGraphics => &INTEGRATED_GRAPHICS,
            SubComponentKind::Port => &PORT,
            SubComponentKind::CoolerSocket => &COOLER_SOCKET,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_lists_match_kind_enums() {
        let components: Vec<_> = ComponentKind::ALL.iter().map(|k| k.tag()).collect();
        let sub_components: Vec<_> = SubComponentKind::ALL.iter().map(|k| k.tag()).collect();
        assert_eq!(components, COMPONENT_TAGS);
        assert_eq!(sub_components, SUB_COMPONENT_TAGS);
    }

    #[test]
    fn performance_amount_keeps_declared_range() {
        let def = CPU.field("PerformanceAmount").expect("field");
        assert_eq!(def.ty, FieldType::Int { min: 0, max: 512 });
        assert!(!def.required);
    }
}
