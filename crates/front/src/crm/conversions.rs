//! Conversions from generated GraphQL response types into domain types.
//!
//! Every person-returning operation selects the same fields, so one macro
//! covers all of them.

use chrono::{DateTime, Utc};
use orbit_core::{CompanyId, FavoriteId, PersonId};

use super::queries::{create_one_person, get_people, get_person, update_one_person};
use super::types::{
    CompanyRef, FavoriteRef, FieldPatch, FieldValue, PeopleListParams, Person, PersonField,
    PersonSortKey, SortDirection,
};

/// Parse a server timestamp. Empty or malformed values map to `None`.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

macro_rules! person_conversion {
    ($fn_name:ident, $module:ident, $person:ident, $company:ident, $favorite:ident) => {
        pub fn $fn_name(p: $module::$person) -> Person {
            Person {
                id: PersonId::new(p.id),
                first_name: p.first_name,
                last_name: p.last_name,
                display_name: p.display_name,
                email: p.email,
                phone: p.phone,
                city: p.city,
                job_title: p.job_title,
                linkedin_url: p.linkedin_url,
                x_url: p.x_url,
                avatar_url: p.avatar_url,
                created_at: parse_timestamp(&p.created_at),
                activity_count: p.activity_count,
                company: p.company.map(|c: $module::$company| CompanyRef {
                    id: CompanyId::new(c.id),
                    name: c.name,
                    domain_name: c.domain_name,
                }),
                favorites: p
                    .favorites
                    .unwrap_or_default()
                    .into_iter()
                    .map(|f: $module::$favorite| FavoriteRef {
                        id: FavoriteId::new(f.id),
                        person_id: f.person.map(|fp| PersonId::new(fp.id)),
                        company_id: f.company.map(|fc| CompanyId::new(fc.id)),
                    })
                    .collect(),
            }
        }
    };
}

person_conversion!(
    convert_get_person,
    get_person,
    GetPersonFindUniquePerson,
    GetPersonFindUniquePersonCompany,
    GetPersonFindUniquePersonFavorites
);
person_conversion!(
    convert_get_people_item,
    get_people,
    GetPeopleFindManyPerson,
    GetPeopleFindManyPersonCompany,
    GetPeopleFindManyPersonFavorites
);
person_conversion!(
    convert_created_person,
    create_one_person,
    CreateOnePersonCreateOnePerson,
    CreateOnePersonCreateOnePersonCompany,
    CreateOnePersonCreateOnePersonFavorites
);
person_conversion!(
    convert_updated_person,
    update_one_person,
    UpdateOnePersonUpdateOnePerson,
    UpdateOnePersonUpdateOnePersonCompany,
    UpdateOnePersonUpdateOnePersonFavorites
);

// =============================================================================
// Request builders
// =============================================================================

/// Build `GetPeople` variables from list parameters.
pub fn people_list_variables(params: &PeopleListParams) -> get_people::Variables {
    let order_by = params.sort.map(|(key, direction)| {
        let order = match direction {
            SortDirection::Asc => get_people::SortOrder::asc,
            SortDirection::Desc => get_people::SortOrder::desc,
        };
        let mut input = get_people::PersonOrderByWithRelationInput {
            first_name: None,
            last_name: None,
            email: None,
            city: None,
            created_at: None,
        };
        match key {
            PersonSortKey::FirstName => input.first_name = Some(order),
            PersonSortKey::LastName => input.last_name = Some(order),
            PersonSortKey::Email => input.email = Some(order),
            PersonSortKey::City => input.city = Some(order),
            PersonSortKey::CreatedAt => input.created_at = Some(order),
        }
        vec![input]
    });

    get_people::Variables {
        order_by,
        skip: params.skip,
        take: params.take,
    }
}

/// Build an update input that carries exactly one field.
pub fn field_patch_input(patch: &FieldPatch) -> update_one_person::PersonUpdateInput {
    let mut input = update_one_person::PersonUpdateInput::default();
    let text = |value: &FieldValue| match value {
        FieldValue::Text(v) => Some(v.clone()),
        // Clearing a nullable field is sent as an empty string.
        FieldValue::OptionalText(v) => Some(v.clone().unwrap_or_default()),
        FieldValue::Company(_) => None,
    };

    match patch.field {
        PersonField::FirstName => input.first_name = text(&patch.value),
        PersonField::LastName => input.last_name = text(&patch.value),
        PersonField::Email => input.email = text(&patch.value),
        PersonField::Phone => input.phone = text(&patch.value),
        PersonField::City => input.city = text(&patch.value),
        PersonField::JobTitle => input.job_title = text(&patch.value),
        PersonField::LinkedinUrl => input.linkedin_url = text(&patch.value),
        PersonField::XUrl => input.x_url = text(&patch.value),
        PersonField::AvatarUrl => input.avatar_url = text(&patch.value),
        PersonField::Company => {
            input.company = Some(match &patch.value {
                FieldValue::Company(Some(company)) => update_one_person::CompanyRelationInput {
                    connect: Some(update_one_person::CompanyWhereUniqueInput {
                        id: Some(company.id.to_string()),
                    }),
                    disconnect: None,
                },
                _ => update_one_person::CompanyRelationInput {
                    connect: None,
                    disconnect: Some(true),
                },
            });
        }
    }

    input
}
