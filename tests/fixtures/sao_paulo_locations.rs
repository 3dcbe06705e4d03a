//! Sao Paulo landmarks for realistic test fixtures.

use route_planner::stops::Stop;

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }

    pub fn stop(&self) -> Stop {
        Stop::new(self.name, self.lat, self.lng)
    }
}

// ============================================================================
// Depot
// ============================================================================

pub const PRACA_DA_SE: Location = Location::new("Praca da Se", -23.5503, -46.6340);

// ============================================================================
// Delivery points
// ============================================================================

pub const MASP: Location = Location::new("MASP", -23.5614, -46.6559);
pub const IBIRAPUERA: Location = Location::new("Parque Ibirapuera", -23.5874, -46.6576);
pub const MERCADAO: Location = Location::new("Mercado Municipal", -23.5417, -46.6297);
pub const ESTACAO_DA_LUZ: Location = Location::new("Estacao da Luz", -23.5349, -46.6350);
pub const THEATRO_MUNICIPAL: Location = Location::new("Theatro Municipal", -23.5452, -46.6388);
pub const COPAN: Location = Location::new("Edificio Copan", -23.5464, -46.6445);
pub const LIBERDADE: Location = Location::new("Liberdade", -23.5558, -46.6353);
pub const IPIRANGA: Location = Location::new("Museu do Ipiranga", -23.5855, -46.6096);
pub const ALLIANZ_PARQUE: Location = Location::new("Allianz Parque", -23.5275, -46.6787);
pub const PACAEMBU: Location = Location::new("Estadio do Pacaembu", -23.5474, -46.6652);
pub const ELDORADO: Location = Location::new("Shopping Eldorado", -23.5725, -46.6966);
pub const BECO_DO_BATMAN: Location = Location::new("Beco do Batman", -23.5560, -46.6880);
pub const VILLA_LOBOS: Location = Location::new("Parque Villa-Lobos", -23.5466, -46.7222);
pub const MORUMBI: Location = Location::new("Estadio do Morumbi", -23.6000, -46.7203);
pub const CONGONHAS: Location = Location::new("Aeroporto de Congonhas", -23.6273, -46.6566);
pub const NEO_QUIMICA_ARENA: Location = Location::new("Neo Quimica Arena", -23.5453, -46.4742);

/// Ten deliveries entered in an order that criss-crosses the city.
pub const ZIGZAG: &[Location] = &[
    VILLA_LOBOS,
    IPIRANGA,
    ALLIANZ_PARQUE,
    CONGONHAS,
    ESTACAO_DA_LUZ,
    MORUMBI,
    MERCADAO,
    ELDORADO,
    NEO_QUIMICA_ARENA,
    BECO_DO_BATMAN,
];

/// Compact downtown deliveries.
pub const DOWNTOWN: &[Location] = &[
    MERCADAO,
    ESTACAO_DA_LUZ,
    THEATRO_MUNICIPAL,
    COPAN,
    LIBERDADE,
    MASP,
    PACAEMBU,
    IBIRAPUERA,
];

/// Depot followed by `deliveries`, in that order.
pub fn stops_from(depot: &Location, deliveries: &[Location]) -> Vec<Stop> {
    std::iter::once(depot)
        .chain(deliveries)
        .map(Location::stop)
        .collect()
}
