use crate::api::{DefaultValue, FieldKind, FieldSpec};
use crate::database::models::ContentRecord;
use crate::database::SortKey;
use crate::uploads::UploadPolicy;

use super::{Access, EntityDef, NotifyRule, ParentRef, SlugRule, UploadRule};

const fn image(field: &'static str) -> Option<UploadRule> {
    Some(UploadRule {
        part: field,
        field,
        policy: UploadPolicy::Image,
    })
}

const fn email(name: &'static str) -> FieldSpec {
    FieldSpec::new(name, FieldKind::Email)
}

const fn list(name: &'static str) -> FieldSpec {
    FieldSpec::new(name, FieldKind::StringList)
}

const fn date(name: &'static str) -> FieldSpec {
    FieldSpec::new(name, FieldKind::Date)
}

const fn number(name: &'static str) -> FieldSpec {
    FieldSpec::new(name, FieldKind::Number)
}

const fn count(name: &'static str, default: i64) -> FieldSpec {
    FieldSpec::new(name, FieldKind::Int { min: Some(0), max: None }).default(DefaultValue::Int(default))
}

const BASE: EntityDef = EntityDef {
    path: "",
    table: "",
    label: "",
    fields: &[],
    upload: None,
    sort: SortKey::NewestFirst,
    unique: &[],
    slug: None,
    parents: &[],
    lookup: None,
    read: Access::Public,
    create: Access::Admin,
    notify: None,
};

fn text_of(record: &ContentRecord, field: &str) -> String {
    record.get_str(field).unwrap_or("?").to_string()
}

fn contact_subject(record: &ContentRecord) -> String {
    format!(
        "New contact from {} <{}> about {}",
        text_of(record, "name"),
        text_of(record, "email"),
        text_of(record, "serviceInterested")
    )
}

fn application_subject(record: &ContentRecord) -> String {
    format!(
        "New application for {} from {}",
        text_of(record, "careerTitle"),
        text_of(record, "fullName")
    )
}

fn enrollment_subject(record: &ContentRecord) -> String {
    format!(
        "New enrollment request from {} <{}>",
        text_of(record, "name"),
        text_of(record, "email")
    )
}

pub static ENTITIES: &[EntityDef] = &[
    EntityDef {
        path: "blogs",
        table: "blogs",
        label: "Blog",
        fields: &[
            FieldSpec::text("title").required(),
            FieldSpec::text("author").required(),
            date("date").default(DefaultValue::Now),
            FieldSpec::text("image").required(),
            FieldSpec::text("description").required(),
        ],
        upload: image("image"),
        sort: SortKey::Desc("date"),
        ..BASE
    },
    EntityDef {
        path: "careers",
        table: "careers",
        label: "Career",
        fields: &[
            FieldSpec::text("title").required(),
            FieldSpec::text("description").required(),
            FieldSpec::text("image").required(),
            list("requirements").required(),
            list("responsibilities").required(),
            FieldSpec::text("applyLink").required(),
            FieldSpec::text("location").required(),
        ],
        upload: image("image"),
        ..BASE
    },
    EntityDef {
        path: "career-applications",
        table: "career_applications",
        label: "Application",
        fields: &[
            FieldSpec::int("careerId").required(),
            FieldSpec::text("fullName").required(),
            email("email").required(),
            FieldSpec::text("phone").required(),
            FieldSpec::text("coverLetter"),
            FieldSpec::text("cvUrl").required(),
            FieldSpec::new(
                "status",
                FieldKind::Enum(&["pending", "reviewed", "shortlisted", "rejected"]),
            )
            .default(DefaultValue::Str("pending")),
        ],
        upload: Some(UploadRule {
            part: "cv",
            field: "cvUrl",
            policy: UploadPolicy::Document,
        }),
        parents: &[ParentRef {
            field: "careerId",
            table: "careers",
            label: "Career",
            copy: Some(("title", "careerTitle")),
            filterable: true,
        }],
        read: Access::Admin,
        create: Access::Public,
        notify: Some(NotifyRule {
            event: "career_application",
            subject: application_subject,
        }),
        ..BASE
    },
    EntityDef {
        path: "projects",
        table: "projects",
        label: "Project",
        fields: &[
            FieldSpec::text("title").required(),
            FieldSpec::text("description").required(),
            FieldSpec::text("image"),
            list("links").default(DefaultValue::EmptyList),
            list("techStack").required(),
            FieldSpec::text("category").required(),
        ],
        upload: image("image"),
        ..BASE
    },
    EntityDef {
        path: "services",
        table: "services",
        label: "Service",
        fields: &[
            FieldSpec::text("title").required(),
            FieldSpec::text("logo"),
            FieldSpec::text("description").required(),
        ],
        upload: image("logo"),
        ..BASE
    },
    EntityDef {
        path: "testimonials",
        table: "testimonials",
        label: "Testimonial",
        fields: &[
            FieldSpec::text("name").required(),
            FieldSpec::text("position").required(),
            FieldSpec::text("company"),
            FieldSpec::text("image"),
            FieldSpec::new("rating", FieldKind::Int { min: Some(1), max: Some(5) })
                .required()
                .default(DefaultValue::Int(5)),
            FieldSpec::text("text").required(),
            FieldSpec::boolean("featured", false),
            FieldSpec::boolean("isActive", true),
        ],
        upload: image("image"),
        ..BASE
    },
    EntityDef {
        path: "partners",
        table: "partners",
        label: "Partner",
        fields: &[
            FieldSpec::text("name").required(),
            FieldSpec::text("image").required(),
        ],
        upload: image("image"),
        ..BASE
    },
    EntityDef {
        path: "contacts",
        table: "contacts",
        label: "Contact",
        fields: &[
            FieldSpec::text("name").required(),
            email("email").required(),
            FieldSpec::text("phoneNumber").required(),
            FieldSpec::text("companyName"),
            FieldSpec::text("serviceInterested").required(),
            FieldSpec::text("message").required(),
        ],
        read: Access::Admin,
        create: Access::Public,
        notify: Some(NotifyRule {
            event: "contact",
            subject: contact_subject,
        }),
        ..BASE
    },
    EntityDef {
        path: "contact-info",
        table: "contact_info",
        label: "Contact info",
        fields: &[
            FieldSpec::new("location", FieldKind::Object).required(),
            email("email").required(),
            FieldSpec::text("phone").required(),
            FieldSpec::text("workingHours").required(),
        ],
        ..BASE
    },
    EntityDef {
        path: "faqs",
        table: "faqs",
        label: "FAQ",
        fields: &[
            FieldSpec::text("question").required(),
            FieldSpec::text("answer").required(),
        ],
        ..BASE
    },
    EntityDef {
        path: "categories",
        table: "categories",
        label: "Category",
        fields: &[FieldSpec::text("name").required(), FieldSpec::text("slug")],
        sort: SortKey::Asc("name"),
        unique: &["name", "slug"],
        slug: Some(SlugRule {
            source: "name",
            target: "slug",
        }),
        ..BASE
    },
    EntityDef {
        path: "courses",
        table: "courses",
        label: "Course",
        fields: &[
            FieldSpec::text("title").required(),
            FieldSpec::text("slug"),
            FieldSpec::text("description"),
            FieldSpec::text("tagline"),
            FieldSpec::text("image"),
            FieldSpec::text("instructorName"),
            FieldSpec::text("instructorBio"),
            FieldSpec::text("instructorImage"),
            FieldSpec::new("instructorLinks", FieldKind::StringMap).default(DefaultValue::EmptyMap),
            list("whatYouWillLearn").default(DefaultValue::EmptyList),
            FieldSpec::new("syllabus", FieldKind::ObjectList).default(DefaultValue::EmptyList),
            list("outcomes").default(DefaultValue::EmptyList),
            list("prerequisites").default(DefaultValue::EmptyList),
            list("targetAudience").default(DefaultValue::EmptyList),
            FieldSpec::new("faqs", FieldKind::ObjectList).default(DefaultValue::EmptyList),
            FieldSpec::boolean("isPopular", false),
            FieldSpec::boolean("isFeatured", false),
            FieldSpec::text("duration"),
            FieldSpec::new("level", FieldKind::Enum(&["Beginner", "Intermediate", "Advanced"]))
                .default(DefaultValue::Str("Beginner")),
            FieldSpec::boolean("certificateProvided", true),
        ],
        upload: image("image"),
        unique: &["slug"],
        slug: Some(SlugRule {
            source: "title",
            target: "slug",
        }),
        lookup: Some("slug"),
        ..BASE
    },
    EntityDef {
        path: "batches",
        table: "batches",
        label: "Batch",
        fields: &[
            FieldSpec::int("courseId"),
            FieldSpec::text("name").required(),
            date("startDate").required(),
            date("endDate"),
            FieldSpec::text("timings").default(DefaultValue::Str("TBD")),
            FieldSpec::text("mode").default(DefaultValue::Str("Live Online")),
            count("totalSeats", 20),
            count("bookedSeats", 0),
            number("fee").required(),
            number("earlyBirdFee"),
            date("earlyBirdDeadline"),
            FieldSpec::new(
                "status",
                FieldKind::Enum(&["upcoming", "filling fast", "ongoing", "completed"]),
            )
            .default(DefaultValue::Str("upcoming")),
            FieldSpec::text("enrollmentLink"),
        ],
        sort: SortKey::Asc("startDate"),
        parents: &[ParentRef {
            field: "courseId",
            table: "courses",
            label: "Course",
            copy: None,
            filterable: true,
        }],
        ..BASE
    },
    EntityDef {
        path: "enrollments",
        table: "enrollments",
        label: "Enrollment",
        fields: &[
            FieldSpec::int("courseId"),
            FieldSpec::int("batchId"),
            FieldSpec::text("name").required(),
            email("email").required(),
            FieldSpec::text("phone").required(),
            FieldSpec::text("qualification"),
            FieldSpec::text("profession"),
            FieldSpec::text("source"),
            FieldSpec::text("message"),
            FieldSpec::new(
                "status",
                FieldKind::Enum(&["new", "contacted", "enrolled", "rejected"]),
            )
            .default(DefaultValue::Str("new")),
            date("contactedAt"),
            date("enrolledAt"),
            FieldSpec::text("notes"),
        ],
        parents: &[
            ParentRef {
                field: "courseId",
                table: "courses",
                label: "Course",
                copy: None,
                filterable: true,
            },
            ParentRef {
                field: "batchId",
                table: "batches",
                label: "Batch",
                copy: None,
                filterable: true,
            },
        ],
        read: Access::Admin,
        create: Access::Public,
        notify: Some(NotifyRule {
            event: "enrollment",
            subject: enrollment_subject,
        }),
        ..BASE
    },
];
