use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::context::LedgerContext;
use crate::errors::{LedgerError, Result};
use crate::types::{ClassId, SchoolId, StudentId};

/// a class (grade) of the school
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolClass {
    pub id: ClassId,
    pub school_id: SchoolId,
    pub name: String,
}

/// where a student currently sits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub class_id: ClassId,
    pub section: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub school_id: SchoolId,
    pub name: String,
    pub roll_no: Option<String>,
    pub father_name: Option<String>,
    pub phone: Option<String>,
    /// class named on the admission record
    pub admitted_class: Option<ClassId>,
    /// academic profile; fees can only be assigned once it exists
    pub profile: Option<StudentProfile>,
    pub is_active: bool,
}

impl Student {
    pub fn class_id(&self) -> Result<ClassId> {
        self.profile
            .as_ref()
            .map(|p| p.class_id)
            .ok_or_else(|| {
                LedgerError::validation(
                    "profile",
                    format!("student {} has no class profile", self.id),
                )
            })
    }
}

/// input for enrolling a student
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewStudent {
    pub name: String,
    pub roll_no: Option<String>,
    pub father_name: Option<String>,
    pub phone: Option<String>,
    pub class_id: Option<ClassId>,
    pub section: Option<String>,
    /// admit to the class now, create the academic profile later
    pub profile_pending: bool,
}

/// classes and students known to the ledger
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    classes: HashMap<ClassId, SchoolClass>,
    students: HashMap<StudentId, Student>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&mut self, ctx: &LedgerContext, name: &str) -> Result<SchoolClass> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::validation("name", "class name is required"));
        }
        if self
            .classes
            .values()
            .any(|c| ctx.owns(c.school_id) && c.name.eq_ignore_ascii_case(name))
        {
            return Err(LedgerError::conflict(format!("class '{}' already exists", name)));
        }

        let class = SchoolClass {
            id: Uuid::new_v4(),
            school_id: ctx.school_id,
            name: name.to_string(),
        };
        self.classes.insert(class.id, class.clone());
        info!(class_id = %class.id, name = %class.name, "class added");
        Ok(class)
    }

    pub fn enroll_student(&mut self, ctx: &LedgerContext, new: NewStudent) -> Result<Student> {
        if new.name.trim().is_empty() {
            return Err(LedgerError::validation("name", "student name is required"));
        }
        if let Some(class_id) = new.class_id {
            self.class(ctx, class_id)?;
        }
        let profile = new
            .class_id
            .filter(|_| !new.profile_pending)
            .map(|class_id| StudentProfile {
                class_id,
                section: new.section,
            });

        let student = Student {
            id: Uuid::new_v4(),
            school_id: ctx.school_id,
            name: new.name.trim().to_string(),
            roll_no: new.roll_no,
            father_name: new.father_name,
            phone: new.phone,
            admitted_class: new.class_id,
            profile,
            is_active: true,
        };
        self.students.insert(student.id, student.clone());
        info!(
            student_id = %student.id,
            admitted_class = ?student.admitted_class,
            profile = student.profile.is_some(),
            "student enrolled"
        );
        Ok(student)
    }

    /// place a student in a class, creating the profile if missing
    pub fn place_student(
        &mut self,
        ctx: &LedgerContext,
        student_id: StudentId,
        class_id: ClassId,
        section: Option<String>,
    ) -> Result<()> {
        self.class(ctx, class_id)?;
        let student = self
            .students
            .get_mut(&student_id)
            .filter(|s| ctx.owns(s.school_id))
            .ok_or_else(|| LedgerError::not_found("student", student_id))?;
        student.admitted_class = Some(class_id);
        student.profile = Some(StudentProfile { class_id, section });
        info!(student_id = %student_id, class_id = %class_id, "student placed");
        Ok(())
    }

    pub fn class(&self, ctx: &LedgerContext, class_id: ClassId) -> Result<&SchoolClass> {
        self.classes
            .get(&class_id)
            .filter(|c| ctx.owns(c.school_id))
            .ok_or_else(|| LedgerError::not_found("class", class_id))
    }

    pub fn student(&self, ctx: &LedgerContext, student_id: StudentId) -> Result<&Student> {
        self.students
            .get(&student_id)
            .filter(|s| ctx.owns(s.school_id))
            .ok_or_else(|| LedgerError::not_found("student", student_id))
    }

    /// active students of the class, ordered by roll number then name; a
    /// profile's class wins over the admission record
    pub fn students_in_class(&self, ctx: &LedgerContext, class_id: ClassId) -> Result<Vec<&Student>> {
        self.class(ctx, class_id)?;
        let mut students: Vec<&Student> = self
            .students
            .values()
            .filter(|s| ctx.owns(s.school_id) && s.is_active)
            .filter(|s| s.profile.as_ref().map(|p| p.class_id).or(s.admitted_class) == Some(class_id))
            .collect();
        students.sort_by(|a, b| roster_order(a, b));
        Ok(students)
    }

    /// active students whose name, phone or roll number contains `query`,
    /// ignoring case
    pub fn search_students(&self, ctx: &LedgerContext, query: &str) -> Result<Vec<&Student>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(LedgerError::validation(
                "q",
                "enter a student name, phone or roll number",
            ));
        }
        let hit = |value: Option<&str>| value.map_or(false, |v| v.to_lowercase().contains(&needle));

        let mut students: Vec<&Student> = self
            .students
            .values()
            .filter(|s| ctx.owns(s.school_id) && s.is_active)
            .filter(|s| hit(Some(s.name.as_str())) || hit(s.phone.as_deref()) || hit(s.roll_no.as_deref()))
            .collect();
        students.sort_by(|a, b| roster_order(a, b));
        Ok(students)
    }
}

/// roll number, then name, then id
fn roster_order(a: &Student, b: &Student) -> std::cmp::Ordering {
    a.roll_no
        .cmp(&b.roll_no)
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}
