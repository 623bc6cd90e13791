use crate::span::Spanned;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub imports: Vec<Spanned<ImportDecl>>,
    pub classes: Vec<Spanned<ClassDecl>>,
    pub extern_fns: Vec<Spanned<ExternFnDecl>>,
    pub functions: Vec<Spanned<Function>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub path: Vec<Spanned<String>>,
    pub alias: Option<Spanned<String>>,
}

impl ImportDecl {
    pub fn binding_name(&self) -> &str {
        if let Some(alias) = &self.alias {
            &alias.node
        } else {
            &self.path.last().expect("import path is never empty").node
        }
    }

    pub fn full_path(&self) -> String {
        self.path.iter().map(|s| s.node.as_str()).collect::<Vec<_>>().join(".")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: Spanned<String>,
    pub fields: Vec<Field>,
    pub is_pub: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: Spanned<String>,
    pub ty: Spanned<TypeExpr>,
}

/// A native function declaration. Has no body and is never analyzed itself;
/// its `throws` clause is the native declared-throws convention.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternFnDecl {
    pub name: Spanned<String>,
    pub params: Vec<Param>,
    pub return_type: Option<Spanned<TypeExpr>>,
    pub throws: Vec<Spanned<TypeExpr>>,
    pub is_pub: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: Spanned<String>,
    pub annotations: Vec<Spanned<Annotation>>,
    pub params: Vec<Param>,
    pub return_type: Option<Spanned<TypeExpr>>,
    pub body: Spanned<Block>,
    pub is_pub: bool,
}

/// `@Path(args...)`. Declared-throws annotations carry class literals as
/// arguments; anything else may appear and is ignored by the analyzer.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub path: Vec<Spanned<String>>,
    pub args: Vec<Spanned<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Spanned<String>,
    pub ty: Spanned<TypeExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Named(String),
    Qualified { module: String, name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Spanned<Stmt>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let {
        name: Spanned<String>,
        ty: Option<Spanned<TypeExpr>>,
        value: Spanned<Expr>,
    },
    Assign {
        target: Spanned<String>,
        value: Spanned<Expr>,
    },
    Return(Option<Spanned<Expr>>),
    If {
        condition: Spanned<Expr>,
        then_block: Spanned<Block>,
        else_block: Option<Spanned<Block>>,
    },
    While {
        condition: Spanned<Expr>,
        body: Spanned<Block>,
    },
    For {
        var: Spanned<String>,
        iterable: Spanned<Expr>,
        body: Spanned<Block>,
    },
    Try {
        body: Spanned<Block>,
        catches: Vec<CatchClause>,
        finally: Option<Spanned<Block>>,
    },
    Throw(Spanned<Expr>),
    /// A named function defined inside another function body.
    Func(Spanned<Function>),
    Expr(Spanned<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub param: Spanned<String>,
    pub ty: Spanned<TypeExpr>,
    pub body: Spanned<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntLit(i64),
    FloatLit(f64),
    BoolLit(bool),
    StringLit(String),
    Ident(String),
    BinOp {
        op: BinOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Spanned<Expr>>,
    },
    Call {
        name: Spanned<String>,
        args: Vec<Spanned<Expr>>,
    },
    MethodCall {
        object: Box<Spanned<Expr>>,
        method: Spanned<String>,
        args: Vec<Spanned<Expr>>,
    },
    FieldAccess {
        object: Box<Spanned<Expr>>,
        field: Spanned<String>,
    },
    Index {
        object: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
    },
    /// `Path::class` — a class literal, as used in throws annotations.
    ClassLit(Vec<Spanned<String>>),
    /// Anonymous function. Its body is not part of the enclosing analysis.
    Closure {
        params: Vec<Param>,
        body: Spanned<Block>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Neg,
    Not,
}
