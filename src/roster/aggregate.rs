use std::collections::HashSet;

use tracing::info;

use crate::model::{ClassInfo, ClassSection, Gender, GenderDistribution, Statistics, Student, Teacher};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSection {
    pub info: ClassInfo,
    pub students: Vec<Student>,
    /// Opened from a keyword-only line; a real class header may still take its place.
    pub provisional: bool,
}

impl OpenSection {
    pub fn new(info: ClassInfo) -> Self {
        Self {
            info,
            students: Vec::new(),
            provisional: false,
        }
    }

    pub fn provisional(info: ClassInfo) -> Self {
        Self {
            provisional: true,
            ..Self::new(info)
        }
    }

    pub fn is_replaceable(&self) -> bool {
        self.provisional && self.students.is_empty() && self.info.teachers.is_empty()
    }

    pub fn add_teacher(&mut self, teacher: Teacher) -> bool {
        if self
            .info
            .teachers
            .iter()
            .any(|existing| existing.name == teacher.name)
        {
            return false;
        }
        self.info.teachers.push(teacher);
        true
    }
}

pub fn compute_statistics(students: &[Student]) -> Statistics {
    let female = students
        .iter()
        .filter(|student| student.gender == Gender::Female)
        .count();
    Statistics {
        total_students: students.len(),
        gender_distribution: GenderDistribution {
            female,
            male: students.len() - female,
        },
    }
}

pub fn dedupe_students_by_id(students: Vec<Student>) -> Vec<Student> {
    let mut seen = HashSet::<String>::new();
    students
        .into_iter()
        .filter(|student| seen.insert(student.student_id.clone()))
        .enumerate()
        .map(|(index, student)| Student {
            order_no: (index + 1) as u32,
            ..student
        })
        .collect()
}

pub fn close_section(
    open: Option<OpenSection>,
    classes: &mut Vec<ClassSection>,
    dedupe_by_id: bool,
) -> bool {
    let Some(open) = open else {
        return false;
    };

    let students = if dedupe_by_id {
        dedupe_students_by_id(open.students)
    } else {
        open.students
    };
    let statistics = compute_statistics(&students);

    info!(
        grade = %open.info.grade,
        section = %open.info.section,
        students = statistics.total_students,
        "closed class section"
    );

    classes.push(ClassSection {
        class_info: open.info,
        students,
        statistics,
    });
    true
}
