use serde::{Deserialize, Serialize};

/// Market reference for a city the agency operates in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaProfile {
    pub name: String,
    /// Lower-case spellings that identify the area in a query.
    pub aliases: Vec<String>,
    pub description: String,
    pub avg_price_per_sq_meter: u32,
    pub trend: String,
    pub highlights: Vec<String>,
    pub schools: Vec<String>,
    pub transport: Vec<String>,
    pub residential_yield: String,
    pub holiday_rental_yield: String,
    pub appreciation: String,
}

impl AreaProfile {
    fn mentioned_in(&self, lowered: &str) -> bool {
        self.aliases.iter().any(|alias| lowered.contains(alias.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseProcedures {
    pub steps: Vec<String>,
    pub documentation: Vec<String>,
    pub new_build_taxes: Vec<String>,
    pub resale_taxes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancingTerms {
    pub current_conditions: String,
    pub requirements: Vec<String>,
    pub partner_banks: u32,
}

/// Read-only reference data behind the assistant's canned answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub areas: Vec<AreaProfile>,
    pub procedures: PurchaseProcedures,
    pub financing: FinancingTerms,
    pub national_yield_summary: String,
}

impl KnowledgeBase {
    /// Answer a topical question, or `None` when nothing applies.
    pub fn answer(&self, query: &str) -> Option<String> {
        let lowered = query.to_lowercase();

        if let Some(area) = self.areas.iter().find(|area| area.mentioned_in(&lowered)) {
            return Some(area_answer(area, &lowered));
        }

        if contains_any(&lowered, &["trámite", "proceso", "pasos"]) {
            return Some(format!(
                "El proceso de compra incluye: {}. ¿Te gustaría información más detallada sobre alguno de estos pasos?",
                self.procedures.steps.join(", ")
            ));
        }

        if contains_any(&lowered, &["documento", "papeles"]) {
            return Some(format!(
                "Para comprar una vivienda necesitarás: {}. Nuestros asesores pueden ayudarte a preparar toda la documentación necesaria.",
                self.procedures.documentation.join(", ")
            ));
        }

        if lowered.contains("impuesto") {
            return Some(if lowered.contains("nueva") {
                format!(
                    "Para viviendas nuevas, los impuestos son: {}.",
                    self.procedures.new_build_taxes.join(", ")
                )
            } else {
                format!(
                    "Para viviendas de segunda mano, el principal impuesto es: {}.",
                    self.procedures.resale_taxes.join(", ")
                )
            });
        }

        if contains_any(&lowered, &["hipoteca", "financiación", "préstamo"]) {
            return Some(format!(
                "Actualmente colaboramos con {} entidades financieras que ofrecen condiciones especiales para nuestros clientes. {}. Los requisitos principales son: {}.",
                self.financing.partner_banks,
                self.financing.current_conditions,
                self.financing.requirements.join(", ")
            ));
        }

        if contains_any(&lowered, &["inversión", "rentabilidad", "alquiler"]) {
            return Some(self.national_yield_summary.clone());
        }

        None
    }

    pub fn standard() -> Self {
        Self {
            areas: vec![
                area(
                    "Madrid",
                    &["madrid"],
                    "Madrid es la capital de España y una de las ciudades más dinámicas para el mercado inmobiliario. Destacan zonas como Salamanca, Chamberí, La Moraleja y Pozuelo.",
                    4200,
                    "alcista",
                    &["Salamanca", "Chamberí", "La Moraleja", "Pozuelo", "Chamartín"],
                    &["Colegio Internacional", "Liceo Europeo", "British Council School"],
                    &["Metro extenso", "Cercanías", "Autobuses urbanos e interurbanos"],
                    ("4-5% bruto anual", "6-8% bruto anual", "5-7% anual últimos 5 años"),
                ),
                area(
                    "Barcelona",
                    &["barcelona"],
                    "Barcelona es una ciudad cosmopolita con gran atractivo para inversores nacionales e internacionales. El Eixample, Pedralbes y Sarrià son zonas premium.",
                    4500,
                    "estable",
                    &["Eixample", "Pedralbes", "Sarrià", "Gràcia", "Sant Cugat"],
                    &["American School", "Escuela Europea", "Liceo Francés"],
                    &["Metro", "Tranvía", "Ferrocarriles catalanes", "Bicing"],
                    (
                        "3.5-4.5% bruto anual",
                        "6-8% bruto anual (con restricciones municipales)",
                        "4-6% anual últimos 5 años",
                    ),
                ),
                area(
                    "Valencia",
                    &["valencia"],
                    "Valencia ofrece una excelente calidad de vida con precios más asequibles que Madrid o Barcelona. El Vedat, La Eliana y el centro histórico son zonas destacadas.",
                    2200,
                    "alcista moderada",
                    &["El Vedat", "La Eliana", "Ciutat Vella", "Eixample", "Patacona"],
                    &["Cambridge House", "Caxton College", "American School"],
                    &["Metro", "Tranvía", "EMT", "Carril bici extenso"],
                    ("5-6% bruto anual", "7-9% bruto anual", "7-9% anual últimos 5 años"),
                ),
                area(
                    "Málaga",
                    &["málaga", "malaga"],
                    "Málaga y la Costa del Sol son destinos premium para segunda residencia e inversión. Marbella, Estepona y el centro histórico de Málaga son zonas muy demandadas.",
                    3100,
                    "alcista",
                    &["Marbella", "Estepona", "Centro Histórico", "Teatinos", "El Limonar"],
                    &["The British School", "Novaschool", "St. George's"],
                    &["Cercanías", "Metro", "Autobuses urbanos"],
                    ("5-7% bruto anual", "8-10% bruto anual", "8-10% anual últimos 5 años"),
                ),
                area(
                    "Sevilla",
                    &["sevilla"],
                    "Sevilla combina patrimonio histórico con zonas residenciales modernas. Triana, Los Remedios y Nervión son barrios con gran demanda.",
                    2300,
                    "estable",
                    &["Triana", "Los Remedios", "Nervión", "Santa Cruz", "Aljarafe"],
                    &["St. Mary's School", "Colegio Internacional Europa", "Colegio Británico"],
                    &["Metro", "Tranvía", "Autobuses urbanos", "Sevici (bicicletas)"],
                    ("5-6% bruto anual", "7-9% bruto anual", "4-6% anual últimos 5 años"),
                ),
            ],
            procedures: PurchaseProcedures {
                steps: strings(&[
                    "Verificación del estado legal de la propiedad (nota simple)",
                    "Comprobación de cargas y deudas pendientes",
                    "Firma de contrato de arras (normalmente 10% del precio)",
                    "Solicitud de hipoteca si es necesario",
                    "Firma de escritura pública ante notario",
                    "Pago de impuestos (ITP o IVA+AJD)",
                    "Inscripción en el Registro de la Propiedad",
                ]),
                documentation: strings(&[
                    "DNI/NIE/Pasaporte",
                    "Justificantes de ingresos (nóminas, declaración de la renta)",
                    "Extractos bancarios de los últimos meses",
                    "Vida laboral",
                    "Documentación adicional para hipoteca según entidad bancaria",
                ]),
                new_build_taxes: strings(&[
                    "IVA (10%)",
                    "Actos Jurídicos Documentados (0.5-1.5% según comunidad)",
                ]),
                resale_taxes: strings(&[
                    "Impuesto de Transmisiones Patrimoniales (6-10% según comunidad)",
                ]),
            },
            financing: FinancingTerms {
                current_conditions: "Actualmente los tipos de interés fijos están entre 2.5-3.5% y los variables en Euribor + 0.9-1.5%".to_string(),
                requirements: strings(&[
                    "Ingresos estables (la cuota no debe superar el 30-35% de los ingresos netos)",
                    "Buen historial crediticio",
                    "Ahorros para entrada (20-30% del precio) y gastos",
                    "Tasación del inmueble",
                ]),
                partner_banks: 5,
            },
            national_yield_summary: "La rentabilidad media por alquiler residencial en España oscila entre el 4% y el 7% bruto anual, dependiendo de la ubicación. Las zonas con mayor potencial de revalorización actualmente son Málaga (8-10% anual), Valencia (7-9% anual) y Madrid (5-7% anual).".to_string(),
        }
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::standard()
    }
}

fn area_answer(area: &AreaProfile, lowered: &str) -> String {
    if contains_any(lowered, &["precio", "coste", "valor"]) {
        return format!(
            "En {}, el precio medio por metro cuadrado es de aproximadamente {}€/m². La tendencia del mercado es {}. Las zonas más destacadas son {}.",
            area.name,
            area.avg_price_per_sq_meter,
            area.trend,
            area.highlights.join(", ")
        );
    }

    if contains_any(lowered, &["colegio", "escuela", "educación"]) {
        return format!(
            "En {} encontrarás excelentes centros educativos como {}. Tenemos propiedades cercanas a estos centros que podrían interesarte.",
            area.name,
            area.schools.join(", ")
        );
    }

    if contains_any(lowered, &["transporte", "comunicación", "metro"]) {
        return format!(
            "{} cuenta con excelentes comunicaciones: {}. La mayoría de nuestras propiedades están bien conectadas con el transporte público.",
            area.name,
            area.transport.join(", ")
        );
    }

    if contains_any(lowered, &["inversión", "rentabilidad", "alquiler"]) {
        return format!(
            "En {}, la rentabilidad media por alquiler residencial es del {}, mientras que para alquiler turístico puede alcanzar el {}. La revalorización media anual ha sido del {}.",
            area.name, area.residential_yield, area.holiday_rental_yield, area.appreciation
        );
    }

    area.description.clone()
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[allow(clippy::too_many_arguments)]
fn area(
    name: &str,
    aliases: &[&str],
    description: &str,
    avg_price_per_sq_meter: u32,
    trend: &str,
    highlights: &[&str],
    schools: &[&str],
    transport: &[&str],
    yields: (&str, &str, &str),
) -> AreaProfile {
    AreaProfile {
        name: name.to_string(),
        aliases: strings(aliases),
        description: description.to_string(),
        avg_price_per_sq_meter,
        trend: trend.to_string(),
        highlights: strings(highlights),
        schools: strings(schools),
        transport: strings(transport),
        residential_yield: yields.0.to_string(),
        holiday_rental_yield: yields.1.to_string(),
        appreciation: yields.2.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_price_question_reports_average_and_trend() {
        let answer = KnowledgeBase::standard()
            .answer("¿Qué precio tiene el metro cuadrado en Valencia?")
            .expect("answer");
        assert!(answer.contains("2200€/m²"));
        assert!(answer.contains("alcista moderada"));
    }

    #[test]
    fn unaccented_alias_finds_malaga() {
        let answer = KnowledgeBase::standard()
            .answer("colegios en malaga")
            .expect("answer");
        assert!(answer.contains("The British School"));
    }

    #[test]
    fn area_investment_question_reports_local_yields() {
        let answer = KnowledgeBase::standard()
            .answer("rentabilidad del alquiler en Sevilla")
            .expect("answer");
        assert!(answer.starts_with("En Sevilla"));
        assert!(answer.contains("5-6% bruto anual"));
    }

    #[test]
    fn area_without_topic_returns_description() {
        let kb = KnowledgeBase::standard();
        let answer = kb.answer("háblame de Barcelona").expect("answer");
        assert_eq!(answer, kb.areas[1].description);
    }

    #[test]
    fn tax_answer_distinguishes_new_builds() {
        let kb = KnowledgeBase::standard();
        assert!(kb
            .answer("impuestos de una vivienda nueva")
            .expect("answer")
            .contains("IVA (10%)"));
        assert!(kb
            .answer("qué impuesto pago")
            .expect("answer")
            .contains("Transmisiones Patrimoniales"));
    }

    #[test]
    fn financing_question_lists_requirements() {
        let answer = KnowledgeBase::standard()
            .answer("¿Cómo consigo una hipoteca?")
            .expect("answer");
        assert!(answer.contains("5 entidades financieras"));
        assert!(answer.contains("Tasación del inmueble"));
    }

    #[test]
    fn unrelated_question_has_no_answer() {
        assert!(KnowledgeBase::standard().answer("hola").is_none());
    }
}
