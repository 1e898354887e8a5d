//! Deterministic names for demo architects, studios and stores.
//!
//! Same RNG stream, same names.

use crate::rng::DemoRng;

pub struct NameGenerator;

impl NameGenerator {
    /// "First Last" for an individual architect.
    pub fn architect_name(rng: &mut DemoRng) -> String {
        let first = Self::pick(rng, Self::first_names());
        let last = Self::pick(rng, Self::last_names());
        format!("{first} {last}")
    }

    /// Studio name for a company document, e.g. "Atelier Moreira Interiores".
    pub fn studio_name(rng: &mut DemoRng) -> String {
        let prefix = Self::pick(rng, Self::studio_prefixes());
        let field = Self::pick(rng, Self::studio_fields());
        if rng.chance(0.5) {
            format!("{prefix} {} {field}", Self::pick(rng, Self::last_names()))
        } else {
            format!("{prefix} {field}")
        }
    }

    /// Store name for position `n`, e.g. "Loja Campinas 03".
    pub fn store_name(rng: &mut DemoRng, n: usize) -> String {
        let city = Self::pick(rng, Self::cities());
        format!("Loja {city} {:02}", n + 1)
    }

    /// Eleven digit individual document or fourteen digit company document.
    pub fn document(rng: &mut DemoRng, company: bool) -> String {
        let len = if company { 14 } else { 11 };
        (0..len)
            .map(|_| char::from(b'0' + rng.below(10) as u8))
            .collect()
    }

    fn pick(rng: &mut DemoRng, items: &'static [&'static str]) -> &'static str {
        rng.pick(items).copied().unwrap_or("")
    }

    fn first_names() -> &'static [&'static str] {
        &[
            "Ana", "Beatriz", "Camila", "Carolina", "Fernanda", "Gabriela", "Helena",
            "Isabela", "Juliana", "Larissa", "Luana", "Mariana", "Patrícia", "Renata",
            "Sofia", "Tatiana", "Vanessa", "André", "Bruno", "Caio", "Daniel", "Eduardo",
            "Felipe", "Gustavo", "Henrique", "Igor", "João", "Leonardo", "Lucas",
            "Marcelo", "Mateus", "Paulo", "Rafael", "Rodrigo", "Thiago", "Vinícius",
        ]
    }

    fn last_names() -> &'static [&'static str] {
        &[
            "Almeida", "Andrade", "Barbosa", "Cardoso", "Carvalho", "Castro", "Costa",
            "Dias", "Fernandes", "Ferreira", "Gomes", "Lima", "Lopes", "Machado",
            "Martins", "Melo", "Moreira", "Nascimento", "Oliveira", "Pereira", "Ribeiro",
            "Rocha", "Santos", "Silva", "Souza", "Teixeira", "Vieira",
        ]
    }

    fn studio_prefixes() -> &'static [&'static str] {
        &["Atelier", "Estúdio", "Escritório", "Casa", "Oficina", "Grupo"]
    }

    fn studio_fields() -> &'static [&'static str] {
        &[
            "Arquitetura", "Interiores", "Design", "Projetos", "Paisagismo", "Ambientes",
        ]
    }

    fn cities() -> &'static [&'static str] {
        &[
            "Campinas", "Curitiba", "Florianópolis", "Goiânia", "Londrina", "Niterói",
            "Recife", "Ribeirão", "Santos", "Sorocaba", "Uberlândia", "Vitória",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::DemoStream;

    #[test]
    fn names_are_deterministic() {
        let mut a = DemoRng::new(12345, DemoStream::Architects);
        let mut b = DemoRng::new(12345, DemoStream::Architects);
        for _ in 0..20 {
            assert_eq!(
                NameGenerator::architect_name(&mut a),
                NameGenerator::architect_name(&mut b)
            );
        }
    }

    #[test]
    fn architect_names_have_two_parts() {
        let mut rng = DemoRng::new(99, DemoStream::Architects);
        for _ in 0..100 {
            let name = NameGenerator::architect_name(&mut rng);
            assert_eq!(name.split_whitespace().count(), 2, "bad name: {name}");
        }
    }

    #[test]
    fn documents_are_digits_of_the_right_length() {
        let mut rng = DemoRng::new(5, DemoStream::Architects);
        let person = NameGenerator::document(&mut rng, false);
        let company = NameGenerator::document(&mut rng, true);
        assert_eq!(person.len(), 11);
        assert_eq!(company.len(), 14);
        assert!(person.chars().chain(company.chars()).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn store_names_are_numbered() {
        let mut rng = DemoRng::new(5, DemoStream::Stores);
        let name = NameGenerator::store_name(&mut rng, 2);
        assert!(name.starts_with("Loja "));
        assert!(name.ends_with(" 03"));
    }
}
